use std::io::{self, BufRead, Write};

use anyhow::{bail, Context, Result};
use clap::Args;
use tracing::debug;

use athus_core::models::ProfileUpdate;
use athus_core::utils::{mask_cep, mask_cpf, mask_phone};
use athus_core::validation::{
    is_profile_complete, is_valid_cpf, validate_profile_edit, validate_sign_up, FieldErrors,
    RegistrationForm, SignUpForm,
};
use athus_core::{
    AddressClient, ApiError, AuthClient, AuthService, Config, SessionEvent, UserService,
};

use crate::Command;

/// Profile fields accepted by `update-profile`. Unset flags are left as is.
#[derive(Args, Debug, Default)]
pub struct ProfileArgs {
    #[arg(long)]
    pub nome: Option<String>,
    /// Mobile phone, digits or `(00) 9 0000-0000`
    #[arg(long)]
    pub telefone: Option<String>,
    #[arg(long)]
    pub cpf: Option<String>,
    /// Birth date as DD/MM/YYYY
    #[arg(long)]
    pub data_nascimento: Option<String>,
    /// Fills rua, cidade and estado from ViaCEP unless given
    #[arg(long)]
    pub cep: Option<String>,
    #[arg(long)]
    pub rua: Option<String>,
    #[arg(long)]
    pub numero: Option<i64>,
    #[arg(long)]
    pub apartamento: Option<i64>,
    #[arg(long)]
    pub logradouro: Option<String>,
    #[arg(long)]
    pub cidade: Option<String>,
    #[arg(long)]
    pub estado: Option<String>,
    #[arg(long)]
    pub pais: Option<String>,
    /// Prompt for a new password
    #[arg(long)]
    pub change_password: bool,
}

pub async fn run(command: Command, client: &AuthClient, config: &mut Config) -> Result<()> {
    match command {
        Command::Login { email } => login(client, config, email).await,
        Command::Logout => {
            AuthService::new(client.clone()).logout()?;
            println!("Logged out");
            Ok(())
        }
        Command::Signup { name, email } => sign_up(client, name, email).await,
        Command::Verify { email, code } => {
            AuthService::new(client.clone())
                .verify_email(&email, &code)
                .await
                .context("Verification failed")?;
            println!("Email verified. Run `athus login {}` to sign in.", email);
            Ok(())
        }
        Command::Status => status(client),
        Command::User { id } => show_user(client, id).await,
        Command::UpdateProfile(args) => update_profile(client, config, args).await,
        Command::Cep { cep } => lookup_cep(config, &cep).await,
        Command::ValidateCpf { cpf } => {
            let masked = mask_cpf(&cpf);
            if is_valid_cpf(&cpf) {
                println!("{}: valid", masked);
                Ok(())
            } else {
                bail!("{}: invalid CPF", masked)
            }
        }
    }
}

/// Tell the user what happened to their session during a command
pub fn report_session_event(event: &SessionEvent) {
    match event {
        SessionEvent::Invalidated { reason } => {
            eprintln!(
                "Your session has ended ({}). Run `athus login` to sign in again.",
                reason
            );
        }
        other => debug!(event = ?other, "Session event"),
    }
}

fn prompt_line(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn print_field_errors(errors: &FieldErrors) {
    for e in errors.iter() {
        eprintln!("  {}: {}", e.field, e.error);
    }
}

async fn login(client: &AuthClient, config: &mut Config, email: Option<String>) -> Result<()> {
    let email = match email.or_else(|| config.last_email.clone()) {
        Some(email) => email,
        None => prompt_line("Email: ")?,
    };
    let senha = rpassword::prompt_password("Senha: ")?;

    let auth = AuthService::new(client.clone());
    let outcome = match auth.login(&email, &senha).await {
        Ok(outcome) => outcome,
        // A rejected login also clears whatever session was stored
        Err(e) if e.is_session_invalid() || matches!(e, ApiError::Unauthorized { .. }) => {
            bail!("Invalid email or password")
        }
        Err(e) => return Err(e).context("Login failed"),
    };

    if !outcome.tokens_issued {
        bail!("The server did not start a session. Has the email been verified?");
    }

    config.last_email = Some(email);
    config.save().context("Failed to save config")?;

    match outcome.user {
        Some(user) => {
            println!("Logged in as {} <{}>", user.nome, user.email);
            if !is_profile_complete(&user) {
                println!("Your profile is incomplete. Use `athus update-profile` to finish it.");
            }
        }
        None => println!("Logged in"),
    }
    Ok(())
}

async fn sign_up(client: &AuthClient, name: String, email: String) -> Result<()> {
    let password = rpassword::prompt_password("Senha: ")?;
    let confirm_password = rpassword::prompt_password("Confirmar senha: ")?;

    let form = SignUpForm {
        full_name: name,
        email,
        password,
        confirm_password,
    };
    let payload = match validate_sign_up(&form) {
        Ok(payload) => payload,
        Err(errors) => {
            print_field_errors(&errors);
            bail!("Signup form has {} invalid field(s)", errors.len());
        }
    };

    match AuthService::new(client.clone()).sign_up(&payload).await {
        Ok(_) => {
            println!(
                "Account created. Enter the code sent to {} with `athus verify`.",
                payload.email
            );
            Ok(())
        }
        Err(ApiError::Conflict(_)) => bail!("An account with this email already exists"),
        Err(e) => Err(e).context("Signup failed"),
    }
}

fn status(client: &AuthClient) -> Result<()> {
    let session = client.session();
    println!("Server: {}", client.base_url());

    if !session.is_authenticated() {
        println!("Not logged in");
        return Ok(());
    }

    match session.user()? {
        Some(user) => {
            println!("Logged in as {} <{}> (id {})", user.nome, user.email, user.id);
            let profile = if is_profile_complete(&user) {
                "complete"
            } else {
                "incomplete"
            };
            println!("Profile: {}", profile);
        }
        None => println!("Logged in"),
    }
    Ok(())
}

async fn show_user(client: &AuthClient, id: Option<i64>) -> Result<()> {
    let users = UserService::new(client.clone());
    let id = match id {
        Some(id) => id,
        None => match users.current_user()? {
            Some(user) => user.id,
            None => bail!("Not logged in; pass a user id or run `athus login`"),
        },
    };

    let user = users.get_user(id).await.context("Failed to fetch user")?;
    println!("{}", serde_json::to_string_pretty(&user)?);
    Ok(())
}

/// Apply an input mask, keeping the raw text when it has no digits so the
/// field still fails validation instead of vanishing.
fn masked(value: &str, mask: fn(&str) -> String) -> String {
    let out = mask(value);
    if out.is_empty() {
        value.trim().to_string()
    } else {
        out
    }
}

/// The edit form as filled by the given flags. Unset flags stay empty.
fn profile_form(args: &ProfileArgs) -> RegistrationForm {
    let text = |v: &Option<String>| v.clone().unwrap_or_default();
    let number = |v: Option<i64>| v.map(|n| n.to_string()).unwrap_or_default();
    RegistrationForm {
        nome: text(&args.nome),
        telefone: args.telefone.as_deref().map(|v| masked(v, mask_phone)).unwrap_or_default(),
        cpf: args.cpf.as_deref().map(|v| masked(v, mask_cpf)).unwrap_or_default(),
        data_nascimento: text(&args.data_nascimento),
        cep: args.cep.as_deref().map(|v| masked(v, mask_cep)).unwrap_or_default(),
        rua: text(&args.rua),
        numero: number(args.numero),
        apartamento: number(args.apartamento),
        logradouro: text(&args.logradouro),
        cidade: text(&args.cidade),
        estado: text(&args.estado),
        pais: text(&args.pais),
        ..Default::default()
    }
}

fn build_profile_update(form: &RegistrationForm) -> Result<ProfileUpdate, FieldErrors> {
    validate_profile_edit(form, chrono::Local::now().date_naive())
}

async fn update_profile(client: &AuthClient, config: &Config, args: ProfileArgs) -> Result<()> {
    let mut form = profile_form(&args);
    if args.change_password {
        form.senha = rpassword::prompt_password("Nova senha: ")?;
        form.confirmar_senha = rpassword::prompt_password("Confirmar senha: ")?;
    }

    let mut update = match build_profile_update(&form) {
        Ok(update) => update,
        Err(errors) => {
            print_field_errors(&errors);
            bail!("{} invalid field(s)", errors.len());
        }
    };

    // Same autofill as the register screen: CEP fills the street address
    if let Some(ref cep) = update.cep {
        if update.rua.is_none() || update.cidade.is_none() || update.estado.is_none() {
            let lookup = AddressClient::with_base_url(&config.viacep_url())?;
            match lookup.lookup(cep).await? {
                Some(address) => {
                    update.rua.get_or_insert(address.rua);
                    update.cidade.get_or_insert(address.cidade);
                    update.estado.get_or_insert(address.estado);
                    update.pais.get_or_insert(address.pais);
                }
                None => eprintln!("CEP {} not found; address fields left unchanged", cep),
            }
        }
    }

    let users = UserService::new(client.clone());
    users
        .update_user(&update)
        .await
        .context("Profile update failed")?;
    println!("Profile updated");

    if let Some(user) = users.current_user()? {
        if is_profile_complete(&user) {
            println!("Your profile is complete.");
        }
    }
    Ok(())
}

async fn lookup_cep(config: &Config, cep: &str) -> Result<()> {
    let lookup = AddressClient::with_base_url(&config.viacep_url())?;
    match lookup.lookup(cep).await? {
        Some(address) => {
            println!("{}", address.rua);
            println!("{} - {}", address.cidade, address.estado);
            println!("{} {}", address.cep, address.pais);
        }
        None => println!("CEP não encontrado"),
    }
    Ok(())
}
