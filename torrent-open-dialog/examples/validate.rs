//! Run the confirm gate over paths given on the command line.
//!
//! ```text
//! RUST_LOG=torrent_open_dialog=trace cargo run --example validate -- a.torrent notes.txt
//! ```
use torrent_open_dialog::{
    CandidateSet, ConfirmDecision, ConfirmHandler, ConfirmPolicy, MixedSelectionPolicy,
    OpenTorrentDialog, format_rejections,
};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let strict = args.iter().any(|a| a == "--strict");
    args.retain(|a| a != "--strict");

    let Some(candidates) = CandidateSet::new(args) else {
        eprintln!("usage: validate [--strict] <file>...");
        std::process::exit(2);
    };

    let policy = ConfirmPolicy {
        mixed: if strict {
            MixedSelectionPolicy::RejectAll
        } else {
            MixedSelectionPolicy::BestEffort
        },
        ..ConfirmPolicy::default()
    };
    let validator = OpenTorrentDialog::new().policy(policy).validator();

    match validator.on_confirm_attempt(&candidates) {
        ConfirmDecision::Proceed(accepted) => {
            for t in accepted {
                println!(
                    "{}\t{}\t{} file(s)\t{} bytes",
                    t.path.display(),
                    t.summary.name,
                    t.summary.file_count,
                    t.summary.total_size
                );
            }
        }
        ConfirmDecision::Retry(rejected) => {
            eprintln!("{}", format_rejections(&rejected));
            std::process::exit(1);
        }
    }
}
