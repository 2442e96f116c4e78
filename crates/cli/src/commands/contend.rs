// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `kl contend` - Run contenders against one lock and report what happened
//!
//! Every contender gets its own session on a shared in-memory ensemble, so
//! they contend exactly as separate processes would.

use crate::config::{parse_duration, CliConfig, Mode, Overrides};
use crate::error::KlError;
use kl_core::{
    InterProcessMutex, LockConfig, LockError, MemoryEnsemble, MemorySession, OwnerId,
    ReadWriteLock, TracedClient,
};
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

type Lock = InterProcessMutex<TracedClient<MemorySession>>;

#[derive(clap::Args, Debug, Default)]
pub struct ContendArgs {
    /// Number of contenders
    #[arg(long)]
    pub owners: Option<usize>,

    /// How long each contender holds the lock (e.g. 50ms, 2s)
    #[arg(long, value_parser = parse_duration)]
    pub hold: Option<Duration>,

    /// Give up waiting after this long
    #[arg(long, value_parser = parse_duration)]
    pub timeout: Option<Duration>,

    /// Which lock to contend on
    #[arg(long, value_enum)]
    pub mode: Option<Mode>,

    /// Holders admitted at once in exclusive mode
    #[arg(long)]
    pub max_leases: Option<u32>,

    /// Parent path for lock nodes
    #[arg(long)]
    pub base_path: Option<String>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

impl ContendArgs {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            base_path: self.base_path.clone(),
            owners: self.owners,
            hold: self.hold,
            timeout: self.timeout,
            mode: self.mode,
            max_leases: self.max_leases,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Mutex,
    Reader,
    Writer,
}

impl Role {
    fn for_contender(mode: Mode, index: usize) -> Self {
        match mode {
            Mode::Exclusive => Role::Mutex,
            Mode::Read => Role::Reader,
            Mode::Write => Role::Writer,
            Mode::Mixed if index % 3 == 0 => Role::Writer,
            Mode::Mixed => Role::Reader,
        }
    }

    fn excludes_others(self) -> bool {
        !matches!(self, Role::Reader)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum Outcome {
    /// `rank` is the position in acquisition order, from 0
    Acquired { rank: usize },
    TimedOut,
    Cancelled,
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct ContenderReport {
    pub owner: String,
    pub role: Role,
    #[serde(flatten)]
    pub outcome: Outcome,
    pub waited_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContendReport {
    pub mode: Mode,
    pub owners: usize,
    /// Owners in the order they acquired
    pub order: Vec<String>,
    pub max_holders: usize,
    pub max_exclusive: usize,
    /// Times a reader and a writer, or two writers, held at once
    pub rw_overlaps: usize,
    pub timeouts: usize,
    pub cancelled: usize,
    pub failed: usize,
    pub watch_fires: u64,
    pub contenders: Vec<ContenderReport>,
}

impl fmt::Display for ContendReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Mode: {}", self.mode)?;
        writeln!(f, "Owners: {}", self.owners)?;
        writeln!(f, "Order: {}", self.order.join(" "))?;
        writeln!(f, "Max holders: {}", self.max_holders)?;
        writeln!(f, "Max exclusive holders: {}", self.max_exclusive)?;
        writeln!(f, "Read/write overlaps: {}", self.rw_overlaps)?;
        writeln!(f, "Timeouts: {}", self.timeouts)?;
        writeln!(f, "Cancelled: {}", self.cancelled)?;
        writeln!(f, "Failed: {}", self.failed)?;
        writeln!(f, "Watch fires: {}", self.watch_fires)?;
        for c in &self.contenders {
            if let Outcome::Failed { error } = &c.outcome {
                writeln!(f, "  {} ({:?}): {}", c.owner, c.role, error)?;
            }
        }
        Ok(())
    }
}

/// Current and peak occupancy of the critical section
#[derive(Default)]
struct Occupancy {
    holders: AtomicUsize,
    peak_holders: AtomicUsize,
    exclusive: AtomicUsize,
    peak_exclusive: AtomicUsize,
    overlaps: AtomicUsize,
    next_rank: AtomicUsize,
}

impl Occupancy {
    /// Writers announce themselves before joining the holders and readers
    /// after, so any reader/writer overlap is seen by one side or the other
    fn enter(&self, role: Role) -> usize {
        if role.excludes_others() {
            let now = self.exclusive.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_exclusive.fetch_max(now, Ordering::SeqCst);
        }
        let others = self.holders.fetch_add(1, Ordering::SeqCst);
        self.peak_holders.fetch_max(others + 1, Ordering::SeqCst);

        let overlapped = match role {
            // Leases may legitimately share
            Role::Mutex => false,
            Role::Writer => others > 0,
            Role::Reader => self.exclusive.load(Ordering::SeqCst) > 0,
        };
        if overlapped {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        self.next_rank.fetch_add(1, Ordering::SeqCst)
    }

    fn leave(&self, role: Role) {
        if role.excludes_others() {
            self.exclusive.fetch_sub(1, Ordering::SeqCst);
        }
        self.holders.fetch_sub(1, Ordering::SeqCst);
    }
}

fn make_lock(role: Role, client: TracedClient<MemorySession>, config: &LockConfig) -> Lock {
    match role {
        Role::Mutex => InterProcessMutex::new(client, config.clone()),
        Role::Reader => ReadWriteLock::with_config(client, config.clone())
            .read_lock()
            .clone(),
        Role::Writer => ReadWriteLock::with_config(client, config.clone())
            .write_lock()
            .clone(),
    }
}

/// Run every contender to completion and summarize
pub async fn run(config: &CliConfig, cancel: CancellationToken) -> anyhow::Result<ContendReport> {
    let contend = &config.contend;
    if contend.owners == 0 {
        return Err(KlError::no_contenders().into());
    }

    let ensemble = MemoryEnsemble::new();
    let occupancy = Arc::new(Occupancy::default());
    let mut tasks = Vec::with_capacity(contend.owners);

    for index in 0..contend.owners {
        let role = Role::for_contender(contend.mode, index);
        let lock = make_lock(role, TracedClient::new(ensemble.connect()), &config.lock);
        let owner = OwnerId::new(format!("owner-{}", index));
        let occupancy = Arc::clone(&occupancy);
        let cancel = cancel.clone();
        let hold = contend.hold;
        let timeout = config.lock.acquire_timeout;

        tasks.push(tokio::spawn(async move {
            contend_once(lock, owner, role, hold, timeout, &occupancy, &cancel).await
        }));
    }

    let mut contenders = Vec::with_capacity(tasks.len());
    for task in tasks {
        contenders.push(task.await?);
    }

    let count = |pred: fn(&Outcome) -> bool| contenders.iter().filter(|c| pred(&c.outcome)).count();
    let timeouts = count(|o| matches!(o, Outcome::TimedOut));
    let cancelled = count(|o| matches!(o, Outcome::Cancelled));
    let failed = count(|o| matches!(o, Outcome::Failed { .. }));

    let mut ranked: Vec<(usize, String)> = contenders
        .iter()
        .filter_map(|c| match c.outcome {
            Outcome::Acquired { rank } => Some((rank, c.owner.clone())),
            _ => None,
        })
        .collect();
    ranked.sort();

    Ok(ContendReport {
        mode: contend.mode,
        owners: contend.owners,
        order: ranked.into_iter().map(|(_, owner)| owner).collect(),
        max_holders: occupancy.peak_holders.load(Ordering::SeqCst),
        max_exclusive: occupancy.peak_exclusive.load(Ordering::SeqCst),
        rw_overlaps: occupancy.overlaps.load(Ordering::SeqCst),
        timeouts,
        cancelled,
        failed,
        watch_fires: ensemble.fired_watches(),
        contenders,
    })
}

async fn contend_once(
    lock: Lock,
    owner: OwnerId,
    role: Role,
    hold: Duration,
    timeout: Option<Duration>,
    occupancy: &Occupancy,
    cancel: &CancellationToken,
) -> ContenderReport {
    let start = Instant::now();
    let acquired = lock.acquire_cancellable(&owner, timeout, cancel).await;
    let waited_ms = start.elapsed().as_millis() as u64;

    let outcome = match acquired {
        Ok(()) => {
            let rank = occupancy.enter(role);
            info!(owner = %owner, rank, waited_ms, "contender holds lock");
            tokio::select! {
                _ = tokio::time::sleep(hold) => {}
                _ = cancel.cancelled() => {}
            }
            occupancy.leave(role);
            match lock.release(&owner).await {
                Ok(()) => Outcome::Acquired { rank },
                Err(e) => Outcome::Failed {
                    error: e.to_string(),
                },
            }
        }
        Err(LockError::Timeout { .. }) => Outcome::TimedOut,
        Err(LockError::Cancelled { .. }) => Outcome::Cancelled,
        Err(e) => {
            warn!(owner = %owner, error = %e, "contender failed");
            Outcome::Failed {
                error: e.to_string(),
            }
        }
    };

    ContenderReport {
        owner: owner.to_string(),
        role,
        outcome,
        waited_ms,
    }
}

#[cfg(test)]
#[path = "contend_tests.rs"]
mod tests;
