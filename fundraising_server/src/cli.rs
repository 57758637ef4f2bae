use std::{env, env::VarError};

/// There's no real CLI for the server, so just do quick 'n dirty
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        // We don't expect any CLI args, so always print the help
        display_readme();
        display_envs();
    }
    has_cli_args
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

fn display_envs() {
    // FRS_ELASTIC_API_KEY is left out on purpose
    const DISPLAY_ENVS: [&str; 12] = [
        "RUST_LOG",
        "FRS_DATABASE_URL",
        "FRS_DB_MAX_CONNECTIONS",
        "FRS_RUN_MIGRATIONS",
        "FRS_ELASTIC_URL",
        "FRS_SYNC_WORKERS",
        "FRS_SYNC_QUEUE_CAPACITY",
        "FRS_INDEX_TIMEOUT_SECS",
        "FRS_STORAGE_TIMEOUT_SECS",
        "FRS_SHUTDOWN_GRACE_SECS",
        "FRS_RESYNC_ON_SETTLEMENT",
        "FRS_STATS_INTERVAL_SECS",
    ];

    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}
