use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};
use tracing::{info, warn};

use sessiongate_core::{
    ApiClient, AuthError, Config, CredentialExchange, CredentialStore, Credentials, Registrar,
    RegistrationError, RegistrationForm, SessionManager, SessionStore, SessionToken, SessionView,
};

fn session_store(config: &Config) -> Result<SessionStore> {
    Ok(SessionStore::new(config.cache_dir()?, config.session_secret()?))
}

fn print_view(view: &SessionView) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(view)?);
    Ok(())
}

fn prompt_password() -> Result<SecretString> {
    let password = rpassword::prompt_password("Password: ").context("Failed to read password")?;
    Ok(SecretString::from(password))
}

pub async fn login(config: &mut Config, username: Option<String>, remember: bool) -> Result<()> {
    let username = username
        .or_else(|| config.last_username.clone())
        .ok_or_else(|| anyhow::anyhow!("No username given (use --username)"))?;

    let credentials = match CredentialStore::load(&username) {
        Some(stored) => {
            info!(username = %username, "Using password from keychain");
            stored
        }
        None => Credentials {
            username: username.clone(),
            password: prompt_password()?,
        },
    };

    let api = ApiClient::new(config)?;
    let exchange = CredentialExchange::new(api.clone());
    let sessions = SessionManager::new(api);
    let store = session_store(config)?;

    let payload = match exchange.authorize(&credentials).await {
        Ok(payload) => payload,
        Err(AuthError::CredentialRejected) => {
            anyhow::bail!("Login failed: the username or password was not accepted")
        }
        Err(e) => return Err(e).context("Login failed"),
    };

    if remember {
        if let Err(e) = CredentialStore::store(&credentials) {
            warn!(error = %e, "Could not remember password");
        }
    }

    config.last_username = Some(username);
    config.save()?;

    let token = sessions.token_hook(None, Some(&payload)).await;
    if let Some(ref token) = token {
        store.save(token)?;
    }

    let view = sessions.session_hook(SessionView::default(), token.as_ref()).await;
    print_view(&view)
}

pub async fn session(config: &Config) -> Result<()> {
    let store = session_store(config)?;
    let current = store.load()?;

    let sessions = SessionManager::new(ApiClient::new(config)?);
    let token = sessions.token_hook(current, None).await;
    match token {
        Some(ref token) => store.save(token)?,
        None => store.clear()?,
    }

    if let Some(SessionToken::Active(ref bundle)) = token {
        eprintln!("Access token valid for {} more minutes", bundle.minutes_until_expiry());
    } else if let Some(SessionToken::Invalid { error }) = token {
        eprintln!("Session is no longer usable ({}); run `sessiongate login`", error);
    } else {
        eprintln!("Not logged in");
    }

    let view = sessions.session_hook(SessionView::default(), token.as_ref()).await;
    print_view(&view)
}

pub fn logout(config: &Config, forget: bool) -> Result<()> {
    session_store(config)?.clear()?;

    if forget {
        if let Some(ref username) = config.last_username {
            CredentialStore::delete(username)?;
        }
    }
    eprintln!("Logged out");
    Ok(())
}

pub async fn register(
    config: &Config,
    first_name: String,
    last_name: String,
    email: String,
    privacy_policy: bool,
) -> Result<()> {
    let password = prompt_password()?;
    let confirm = rpassword::prompt_password("Confirm password: ").context("Failed to read password")?;
    if password.expose_secret() != confirm {
        anyhow::bail!("Passwords do not match");
    }

    let form = RegistrationForm::new(&first_name, &last_name, &email, password, privacy_policy);

    let registrar = Registrar::new(ApiClient::new(config)?);
    match registrar.register(&form).await {
        Ok(message) => {
            println!("{}", message);
            Ok(())
        }
        Err(RegistrationError::Invalid(errors)) => {
            for error in &errors {
                eprintln!("  {}", error);
            }
            anyhow::bail!("Registration form has {} invalid field(s)", errors.len())
        }
        Err(e) => Err(e).context("Registration failed"),
    }
}
