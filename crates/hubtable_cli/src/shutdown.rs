use console::Term;
use hubtable::table::CancelFlag;

/// Install the Ctrl+C handler.
///
/// The first Ctrl+C cancels `cancel`, which stops the running scan after
/// the current item; rows already fetched are still printed. A second
/// Ctrl+C exits immediately.
pub(crate) fn setup_shutdown_handler(cancel: CancelFlag) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            tracing::warn!("Failed to install Ctrl+C handler");
            return;
        }

        let is_tty = Term::stderr().is_term();
        if is_tty {
            eprintln!("\n\nShutdown requested, finishing current page...");
            eprintln!("Press Ctrl+C again to force quit.");
        } else {
            tracing::warn!("Shutdown requested, finishing current page");
        }

        cancel.cancel();

        if tokio::signal::ctrl_c().await.is_ok() {
            if is_tty {
                eprintln!("Force quit!");
            }
            std::process::exit(130);
        }
    });
}
