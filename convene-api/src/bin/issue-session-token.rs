//! Session Token Issuer
//!
//! Mints a session token with the server's `CONVENE_JWT_SECRET`, for local
//! development and manual testing against a running server.
//!
//! Usage:
//!   cargo run -p convene-api --bin issue-session-token -- <user-id> [--email E] [--name N]

use convene_api::{issue_session_token, AuthConfig};

fn usage() -> ! {
    eprintln!("usage: issue-session-token <user-id> [--email EMAIL] [--name NAME]");
    std::process::exit(2);
}

fn main() {
    let mut args = std::env::args().skip(1);
    let Some(user_id) = args.next().filter(|u| !u.starts_with("--")) else {
        usage();
    };

    let mut email = None;
    let mut name = None;
    while let Some(flag) = args.next() {
        match (flag.as_str(), args.next()) {
            ("--email", Some(value)) => email = Some(value),
            ("--name", Some(value)) => name = Some(value),
            _ => usage(),
        }
    }

    let config = AuthConfig::from_env();
    match issue_session_token(&config, user_id, email, name) {
        Ok(token) => println!("{}", token),
        Err(e) => {
            eprintln!("Failed to issue session token: {}", e);
            std::process::exit(1);
        }
    }
}
