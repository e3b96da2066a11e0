use clap::{Parser, Subcommand};

/// Taskdeck — Kanban board service with offline license gating
#[derive(Parser)]
#[command(name = "taskdeck", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the board service
    Serve {
        /// Port to bind
        #[arg(short, long, default_value = "8090")]
        port: u16,
    },

    /// Manage the license
    License {
        #[command(subcommand)]
        command: LicenseCommands,
    },
}

#[derive(Subcommand)]
pub enum LicenseCommands {
    /// Verify a token and store it as the active license
    Install {
        #[arg(long)]
        token: String,
    },
    /// Show the verdict for the currently installed license
    Status,
    /// Sign a new license token (requires the issuer's signing key)
    Issue {
        /// Hex-encoded Ed25519 signing key seed
        #[arg(long)]
        signing_key: String,
        #[arg(long)]
        customer: String,
        /// Expiry date, YYYY-MM-DD
        #[arg(long)]
        expiry: String,
    },
    /// Generate a fresh issuer keypair
    Keygen,
}
