use crate::api::AuthError;

pub const MIN_PASSWORD_LENGTH: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginMode {
    SignIn,
    SignUp,
}

pub fn validate_credentials(email: &str, password: &str) -> Result<(), String> {
    if email.trim().is_empty() {
        return Err("Informe seu e-mail".into());
    }
    if password.is_empty() {
        return Err("Informe sua senha".into());
    }
    Ok(())
}

pub fn validate_sign_up(full_name: &str, email: &str, password: &str) -> Result<(), String> {
    if full_name.trim().is_empty() {
        return Err("Informe seu nome".into());
    }
    validate_credentials(email, password)?;
    validate_password_strength(password)
}

fn validate_password_strength(password: &str) -> Result<(), String> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(format!(
            "A senha deve ter pelo menos {} caracteres",
            MIN_PASSWORD_LENGTH
        ));
    }
    Ok(())
}

/// Checks a password chosen on the setup page against its confirmation.
pub fn validate_new_password(password: &str, confirmation: &str) -> Result<(), String> {
    validate_password_strength(password)?;
    if password != confirmation {
        return Err("As senhas não coincidem".into());
    }
    Ok(())
}

pub fn auth_error_message(err: &AuthError) -> String {
    match err {
        AuthError::InvalidCredentials(_) => "E-mail ou senha inválidos".into(),
        AuthError::Rejected(api) => api.error.clone(),
        AuthError::Request(_) => "Não foi possível conectar. Tente novamente.".into(),
    }
}
