use std::sync::Arc;
use std::time::Duration;

use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use tracing_subscriber::EnvFilter;

use tenantdash::adapters::RestClient;
use tenantdash::config::ClientConfig;
use tenantdash::{AuthState, AuthStore, Profile, SessionWatcher, WatcherHandle};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log filter variable, e.g. `TENANTDASH_LOG=tenantdash=debug`.
const LOG_ENV: &str = "TENANTDASH_LOG";

const READY_TIMEOUT: Duration = Duration::from_secs(30);

const USAGE: &str = "\
Usage: tenantdash <command>

Commands:
  login <email>  Sign in (prompts for the password)
  logout         Sign out and forget the stored session
  whoami         Show the signed-in profile
  watch          Print auth state changes until Ctrl-C

Options:
  --version      Print version
  --help         Print this message

Environment:
  TENANTDASH_URL, TENANTDASH_ANON_KEY (required)
  TENANTDASH_SESSION_FILE, TENANTDASH_TIMEOUT_SECS, TENANTDASH_LOG
";

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    // Handle --version / --help before any initialization
    if args.iter().any(|arg| arg == "--version") {
        println!("tenantdash {}", VERSION);
        return Ok(());
    }
    if args.is_empty() || args.iter().any(|arg| arg == "--help" || arg == "-h") {
        print!("{}", USAGE);
        return Ok(());
    }

    color_eyre::install()?;
    init_tracing();

    let config = ClientConfig::from_env().wrap_err("Failed to load configuration")?;
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run(&args, config))
}

async fn run(args: &[String], config: ClientConfig) -> Result<()> {
    let client = Arc::new(RestClient::new(config)?);
    let handle = SessionWatcher::new(client.clone(), client, AuthStore::new()).start();

    let result = match args[0].as_str() {
        "login" => login(&handle, args.get(1).map(String::as_str)).await,
        "logout" => logout(&handle).await,
        "whoami" => whoami(&handle).await,
        "watch" => watch(&handle).await,
        other => Err(eyre!("Unknown command '{}'\n\n{}", other, USAGE)),
    };

    handle.dispose();
    result
}

async fn wait_ready(handle: &WatcherHandle) -> Result<AuthState> {
    let mut reader = handle.state();
    tokio::time::timeout(READY_TIMEOUT, reader.wait_ready())
        .await
        .map_err(|_| eyre!("Timed out waiting for the session to resolve"))
}

async fn login(handle: &WatcherHandle, email: Option<&str>) -> Result<()> {
    let email = email.ok_or_else(|| eyre!("login needs an email address"))?;
    let password = tokio::task::spawn_blocking(|| rpassword::prompt_password("Password: "))
        .await?
        .wrap_err("Failed to read password")?;

    match handle.sign_in(email, &password).await {
        Ok(profile) => {
            print_profile(&profile);
            Ok(())
        }
        Err(message) => Err(eyre!(message)),
    }
}

async fn logout(handle: &WatcherHandle) -> Result<()> {
    // Let the stored session load so the provider can revoke it.
    wait_ready(handle).await?;
    handle.sign_out().await;
    println!("Signed out.");
    Ok(())
}

async fn whoami(handle: &WatcherHandle) -> Result<()> {
    let state = wait_ready(handle).await?;
    match state.profile {
        Some(profile) => print_profile(&profile),
        None => println!("Not signed in."),
    }
    Ok(())
}

async fn watch(handle: &WatcherHandle) -> Result<()> {
    let mut reader = handle.state();
    print_state(&reader.current());

    loop {
        tokio::select! {
            changed = reader.changed() => match changed {
                Some(state) => print_state(&state),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    Ok(())
}

fn print_state(state: &AuthState) {
    match (&state.profile, state.ready) {
        (_, false) => println!("Resolving session..."),
        (Some(profile), true) => print_profile(profile),
        (None, true) => println!("Signed out."),
    }
}

fn print_profile(profile: &Profile) {
    println!("Signed in as {} <{}>", profile.greeting_name(), profile.email);
    println!("  Tenant: {} ({})", profile.tenant_name, profile.tenant_id);
    println!("  Role:   {}", profile.role.as_deref().unwrap_or("-"));
    match &profile.plan {
        Some(plan) => println!("  Plan:   {}", plan),
        None => println!("  Plan:   -"),
    }
}
