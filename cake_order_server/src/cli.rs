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
    // Be explicit about which envars to print, so as to avoid accidentally exposing secrets
    const DISPLAY_ENVS: [&str; 18] = [
        "RUST_LOG",
        "CAKE_HOST",
        "CAKE_PORT",
        "CAKE_DATABASE_URL",
        "CAKE_RUN_MIGRATIONS",
        "CAKE_CURRENCY",
        "CAKE_ORDER_NUMBER_PREFIX",
        "CAKE_SHIPPING_STANDARD",
        "CAKE_SHIPPING_EXPRESS",
        "CAKE_SHIPPING_PICKUP",
        "CAKE_LOYALTY_SPENDING_RATIO",
        "CAKE_LOYALTY_FIRST_ORDER_BONUS",
        "CAKE_REWARD_TIERS_FILE",
        "CAKE_GATEWAY_ACTION_URL",
        "CAKE_GATEWAY_PROFILE_ID",
        "CAKE_GATEWAY_NOTIFY_URL",
        "CAKE_GATEWAY_SUCCESS_URL",
        "CAKE_GATEWAY_FAILURE_URL",
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
