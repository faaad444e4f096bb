//!
//! Text dashboard
//!
use crate::report::Report;
use crate::units::{format_bytes, format_duration};

const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

/// ANSI sequence clearing the terminal and moving the cursor home
pub const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

/// Render the dashboard for `report`, fetched from `status_url`
#[must_use]
pub fn render(status_url: &str, report: &Report) -> String {
    lines(status_url, report).join("\n")
}

/// Dashboard lines. Fields missing from the report produce no line.
#[must_use]
pub fn lines(status_url: &str, report: &Report) -> Vec<String> {
    let status = &report.status;
    let mut out = vec![format!("Monitoring url {}", status_url)];

    out.push("\nSync Status:".into());
    out.push(if status.is_recovery_complete {
        "Node has completed initial sync".into()
    } else {
        "Node is still running initial sync".into()
    });

    out.push("\nBlock Information:".into());
    out.push(format!("Current block: {}", status.current_block));
    out.push(format!(
        "Last block from governors: {}",
        status.last_block_from_governors
    ));
    out.push(format!(
        "Last sync with governors: {}",
        status.last_synced_with_governor_nodes
    ));
    if report.blocks_per_second > 0.0 {
        out.push(format!("Blocks per second: {:.2}", report.blocks_per_second));
    }

    out.push("\nSuperblock Information:".into());
    out.push(format!("Current superblock: {}", status.current_superblock));
    out.push(format!(
        "Last superblock from bootnodes: {}",
        status.last_superblock_from_bootnodes
    ));
    out.push(format!(
        "Last sync with bootnodes: {}",
        status.last_synced_with_bootnodes
    ));

    out.push("\nCertificate Information:".into());
    out.push(format!("DNS names: {}", status.certificate_dns_names.join(", ")));
    out.push(format!("Valid until: {}", status.certificates_valid_upto));

    out.push("\nSigning Address Information:".into());
    out.push(format!("Address: {}", status.signing_address));
    out.push(format!("Balance: {} RBNT", report.balance));
    if report.below_min_balance {
        out.push(format!(
            "{}WARNING{}: balance is below minimum of {} RBNT",
            RED, RESET, report.min_balance
        ));
    }

    if let Some(is_governor) = report.is_governor {
        out.push("\nNode Role:".into());
        out.push(if is_governor {
            "Governor".into()
        } else {
            "Candidate".into()
        });
    }
    if let Some(peers) = report.peers {
        out.push(format!("Connected peers: {}", peers));
    }

    let txs = &report.transactions;
    if !txs.is_empty() {
        out.push("\nTransactions:".into());
        if let Some(successful) = txs.successful {
            out.push(format!("Successful: {}", successful));
        }
        if let Some(failed) = txs.failed {
            out.push(format!("Failed: {}", failed));
        }
        if let Some(gas) = txs.gas {
            out.push(format!("Gas used: {}", gas));
        }
    }

    let process = &report.process;
    if !process.is_empty() {
        out.push("\nProcess:".into());
        if let Some(memory) = process.resident_memory_bytes {
            out.push(format!("Resident memory: {}", format_bytes(memory)));
        }
        if let Some(cpu) = process.cpu_seconds {
            out.push(format!("CPU time: {}", format_duration(cpu)));
        }
        if let Some(goroutines) = process.goroutines {
            out.push(format!("Goroutines: {}", goroutines));
        }
        match (process.open_fds, process.max_fds, process.fd_usage_percent) {
            (Some(open), Some(max), Some(percent)) => {
                out.push(format!("Open files: {} / {} ({:.2}%)", open, max, percent));
            }
            (Some(open), _, _) => out.push(format!("Open files: {}", open)),
            (None, Some(max), _) => out.push(format!("Open file limit: {}", max)),
            _ => {}
        }
    }

    if let Some(cache) = &report.cache {
        out.push("\nCache:".into());
        out.push(format!("Hits: {} Misses: {}", cache.hits, cache.misses));
        if let Some(rate) = cache.hit_rate {
            out.push(format!("Hit rate: {:.2}%", rate));
        }
    }

    if let Some(processing) = &report.block_processing {
        out.push("\nBlock Processing:".into());
        out.push(format!("Blocks processed: {}", processing.blocks));
        out.push(format!("Average time: {:.2}ms", processing.avg_time_ms));
    }

    if let Some(seconds) = report.recovery_seconds {
        out.push("\nRecovery:".into());
        out.push(format!("Time in recovery: {}", format_duration(seconds)));
    }

    out.push(format!("\nVersion: {}", status.version));
    out
}
