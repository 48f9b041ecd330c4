use filterq::cli::{is_user_error, run};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    #[cfg(windows)]
    let _ = enable_ansi_support::enable_ansi_support();

    if let Err(e) = run() {
        if is_user_error(&e) {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }

        eprintln!("Internal error: {}", e);
        let mut causes = e.chain().skip(1).peekable();
        if causes.peek().is_some() {
            eprintln!("\nCaused by:");
            for (indent, cause) in causes.enumerate() {
                eprintln!("{:indent$}  {}", "", cause, indent = indent + 1);
            }
        }
        std::process::exit(2);
    }
}
