use contextforge::auth::services::Service;
use contextforge::auth::{self, Credential};
use contextforge::error::{ForgeError, Result};
use colored::Colorize;

fn parse_service(name: &str) -> Result<Service> {
    Service::from_str_loose(name).ok_or_else(|| {
        ForgeError::Auth(format!("Unknown service: {}. Use: anthropic, supabase", name))
    })
}

pub fn cmd_auth_login(service_name: Option<String>) -> Result<()> {
    use dialoguer::{Input, Password, Select};

    let service = if let Some(name) = service_name {
        parse_service(&name)?
    } else {
        let items: Vec<&str> = Service::all().iter().map(|s| s.display_name()).collect();
        let selection = Select::new()
            .with_prompt("Select service")
            .items(&items)
            .default(0)
            .interact()
            .map_err(|e| ForgeError::Auth(format!("Selection cancelled: {}", e)))?;
        Service::all()[selection]
    };

    let endpoint = if service.requires_endpoint() {
        let url: String = Input::new()
            .with_prompt(format!("{} URL", service.display_name()))
            .interact_text()
            .map_err(|e| ForgeError::Auth(format!("Input cancelled: {}", e)))?;
        if url.trim().is_empty() {
            return Err(ForgeError::Auth("URL cannot be empty".into()));
        }
        Some(url.trim().trim_end_matches('/').to_string())
    } else {
        None
    };

    let key = Password::new()
        .with_prompt(format!("Enter {} key", service.display_name()))
        .interact()
        .map_err(|e| ForgeError::Auth(format!("Input cancelled: {}", e)))?;

    if key.trim().is_empty() {
        return Err(ForgeError::Auth("Key cannot be empty".into()));
    }

    let mut store = auth::AuthStore::load()?;
    store.set(
        service,
        Credential {
            key: key.trim().to_string(),
            endpoint,
            model: None,
        },
    );
    store.save()?;

    println!(
        "{} Stored credentials for {}.",
        "Done!".green().bold(),
        service.display_name()
    );
    Ok(())
}

pub fn cmd_auth_logout(service_name: &str) -> Result<()> {
    let service = parse_service(service_name)?;

    let mut store = auth::AuthStore::load()?;
    if !store.remove(service) {
        println!(
            "{} No stored credentials for {}.",
            "Note:".cyan(),
            service.display_name()
        );
        return Ok(());
    }
    store.save()?;

    println!(
        "{} Removed credentials for {}.",
        "Done!".green().bold(),
        service.display_name()
    );
    Ok(())
}

pub fn cmd_auth_status() -> Result<()> {
    let store = auth::AuthStore::load()?;

    println!("{}", "Credentials".green().bold());
    println!("{}", "=".repeat(50));

    for &service in Service::all() {
        let env_key = std::env::var(service.key_env_var())
            .ok()
            .filter(|v| !v.trim().is_empty());
        let stored = store.get(service);

        let (source, key) = match (env_key, stored) {
            (Some(key), _) => (format!("{} (env var)", service.key_env_var()).green(), Some(key)),
            (None, Some(cred)) => ("auth.json".cyan(), Some(cred.key.clone())),
            (None, None) => ("not configured".dimmed(), None),
        };

        println!("  {}\t{}", service.display_name().cyan().bold(), source);
        if let Some(key) = key {
            println!("    Key:       {}", auth::mask_secret(&key));
        }

        let endpoint = std::env::var(service.endpoint_env_var())
            .ok()
            .filter(|v| !v.trim().is_empty())
            .or_else(|| stored.and_then(|c| c.endpoint.clone()));
        if let Some(endpoint) = endpoint {
            println!("    Endpoint:  {}", endpoint);
        } else if service.requires_endpoint() {
            println!("    Endpoint:  {}", "not set (using local store)".dimmed());
        }
    }

    println!();
    println!("  Stored in {}", auth::AuthStore::path()?.display());
    Ok(())
}
