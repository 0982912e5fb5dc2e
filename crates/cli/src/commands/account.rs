//! `furni auth` - account commands.

use secrecy::SecretString;

use furni_storefront::AuthGateway;

use super::{App, CliError};
use crate::AuthAction;
use crate::output;

pub async fn run(app: &App, action: AuthAction) -> Result<(), CliError> {
    let auth = app.auth();
    match action {
        AuthAction::SignUp { email, password } => {
            let user = auth.sign_up(&email, &SecretString::from(password)).await?;
            output::success(&format!("Account created. Signed in as {}.", user.email));
        }
        AuthAction::SignIn { email, password } => {
            let user = auth.sign_in(&email, &SecretString::from(password)).await?;
            output::success(&format!("Welcome back! Signed in as {}.", user.email));
        }
        AuthAction::SignOut => {
            app.sign_out().await?;
            output::success("Signed out.");
        }
        AuthAction::ResetPassword { email } => {
            auth.reset_password(&email).await?;
            output::success(&format!("Password reset requested for {email}."));
        }
        AuthAction::Whoami => match auth.current_user() {
            Some(user) => output::success(&format!("{} ({})", user.email, user.id)),
            None => output::success("Not signed in."),
        },
    }
    Ok(())
}
