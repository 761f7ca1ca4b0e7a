//! `login` and `logout` commands

use std::error::Error;

use crate::api::Backend;
use crate::core::auth::{
    login_with_google, login_with_password, password_login_failure_message, remember_token,
    AuthError,
};
use crate::core::keyring::TokenStore;
use crate::utils::line_editor::{prompt_line_editor, MaskMode};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    Password { email: String, password: String },
    Google { token_id: String },
}

/// Exchange `credentials` for a token and persist it.
pub async fn sign_in<B>(
    backend: &B,
    store: &TokenStore,
    credentials: &Credentials,
) -> Result<(), AuthError>
where
    B: Backend + ?Sized,
{
    let token = match credentials {
        Credentials::Password { email, password } => {
            login_with_password(backend, email, password).await?
        }
        Credentials::Google { token_id } => login_with_google(backend, token_id).await?,
    };
    remember_token(store, &token)
}

fn prompt_credentials(email: Option<String>) -> Result<Credentials, Box<dyn Error>> {
    let email = match email {
        Some(email) => email,
        None => prompt_line_editor("Email: ", MaskMode::None)?,
    };
    let password = prompt_line_editor("Password: ", MaskMode::Hidden)?;
    Ok(Credentials::Password { email, password })
}

pub async fn run_login<B>(
    backend: &B,
    store: &TokenStore,
    email: Option<String>,
    google: Option<String>,
) -> Result<(), Box<dyn Error>>
where
    B: Backend + ?Sized,
{
    let credentials = match google {
        Some(token_id) => Credentials::Google { token_id },
        None => prompt_credentials(email)?,
    };

    match sign_in(backend, store, &credentials).await {
        Ok(()) => {
            println!("✅ Signed in");
            Ok(())
        }
        Err(err) => {
            let message = match credentials {
                Credentials::Password { .. } => password_login_failure_message(&err),
                Credentials::Google { .. } => err.to_string(),
            };
            eprintln!("❌ {message}");
            std::process::exit(1);
        }
    }
}

pub fn run_logout(store: &TokenStore) -> Result<(), Box<dyn Error>> {
    store.clear()?;
    println!("✅ Signed out");
    Ok(())
}
