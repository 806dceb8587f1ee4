use chrono::NaiveDate;

use super::cpf::is_valid_cpf;
use super::date::{br_date_to_iso, validate_birth_date};
use super::{FieldErrors, ValidationError};
use crate::models::{ProfileUpdate, SignUpPayload, User};

pub const MIN_PASSWORD_LEN: usize = 6;

fn is_email_local_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '+' | '-')
}

fn is_domain_label_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-'
}

/// `local@label.rest`, where the label has no dots and the rest may.
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    let Some((label, rest)) = domain.split_once('.') else {
        return false;
    };

    !local.is_empty()
        && local.chars().all(is_email_local_char)
        && !label.is_empty()
        && label.chars().all(is_domain_label_char)
        && !rest.is_empty()
        && rest.chars().all(|c| is_domain_label_char(c) || c == '.')
}

/// Mobile phone in the masked form `(DD) 9 DDDD-DDDD`
pub fn is_valid_phone(phone: &str) -> bool {
    const SHAPE: &str = "(00) 9 0000-0000";
    phone.len() == SHAPE.len()
        && phone.chars().zip(SHAPE.chars()).all(|(c, s)| match s {
            '0' => c.is_ascii_digit(),
            _ => c == s,
        })
}

/// At least two words, each longer than one character
pub fn is_valid_full_name(name: &str) -> bool {
    let words: Vec<&str> = name.split_whitespace().collect();
    words.len() >= 2 && words.iter().all(|w| w.chars().count() > 1)
}

/// `00000-000` or `00000000`
pub fn is_valid_cep(cep: &str) -> bool {
    let digits = |s: &str, n: usize| s.len() == n && s.chars().all(|c| c.is_ascii_digit());
    match cep.split_once('-') {
        Some((head, tail)) => digits(head, 5) && digits(tail, 3),
        None => digits(cep, 8),
    }
}

fn check_required(errors: &mut FieldErrors, field: &'static str, value: &str) -> bool {
    if value.trim().is_empty() {
        errors.push(field, ValidationError::Required);
        false
    } else {
        true
    }
}

fn check_password(errors: &mut FieldErrors, senha: &str, confirmar: &str) {
    if check_required(errors, "senha", senha) && senha.chars().count() < MIN_PASSWORD_LEN {
        errors.push("senha", ValidationError::TooShort(MIN_PASSWORD_LEN));
    }
    if check_required(errors, "confirmarSenha", confirmar) && senha != confirmar {
        errors.push("confirmarSenha", ValidationError::PasswordMismatch);
    }
}

/// Parse an optional integer field; empty means unset
fn parse_optional_number(value: &str) -> Result<Option<i64>, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse()
        .map(Some)
        .map_err(|_| ValidationError::NotANumber)
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Fields of the signup screen
#[derive(Debug, Clone, Default)]
pub struct SignUpForm {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

/// Validate the signup screen and build the payload for `/auth/cadastrar`.
pub fn validate_sign_up(form: &SignUpForm) -> Result<SignUpPayload, FieldErrors> {
    let mut errors = FieldErrors::new();

    check_required(&mut errors, "nomeCompleto", &form.full_name);
    if check_required(&mut errors, "email", &form.email) && !is_valid_email(form.email.trim()) {
        errors.push("email", ValidationError::InvalidEmail);
    }
    check_password(&mut errors, &form.password, &form.confirm_password);

    errors.into_result(SignUpPayload {
        nome_completo: form.full_name.trim().to_string(),
        email: form.email.trim().to_string(),
        senha: form.password.clone(),
    })
}

/// Fields of the multi-step register screen, as typed (masked strings,
/// `DD/MM/YYYY` birth date).
#[derive(Debug, Clone, Default)]
pub struct RegistrationForm {
    pub nome: String,
    pub email: String,
    pub telefone: String,
    pub cpf: String,
    pub data_nascimento: String,
    pub pais: String,
    pub estado: String,
    pub cidade: String,
    pub cep: String,
    pub rua: String,
    pub numero: String,
    pub apartamento: String,
    pub logradouro: String,
    pub senha: String,
    pub confirmar_senha: String,
}

impl RegistrationForm {
    /// Build the `PUT /usuarios` body. Expects a form that already passed
    /// `validate_registration` or `validate_profile_edit`; empty fields and
    /// unparseable numbers are left unset.
    pub fn to_profile_update(&self) -> ProfileUpdate {
        let iso = br_date_to_iso(&self.data_nascimento);
        ProfileUpdate {
            nome: non_empty(&self.nome),
            email: non_empty(&self.email),
            telefone: non_empty(&self.telefone),
            cpf: non_empty(&self.cpf),
            data_nascimento: non_empty(&iso),
            pais: non_empty(&self.pais),
            estado: non_empty(&self.estado),
            cidade: non_empty(&self.cidade),
            cep: non_empty(&self.cep),
            rua: non_empty(&self.rua),
            numero: parse_optional_number(&self.numero).ok().flatten(),
            apartamento: parse_optional_number(&self.apartamento).ok().flatten(),
            logradouro: non_empty(&self.logradouro),
            imagem_perfil: None,
            senha: (!self.senha.is_empty()).then(|| self.senha.clone()),
            confirmar_senha: (!self.confirmar_senha.is_empty()).then(|| self.confirmar_senha.clone()),
        }
    }
}

/// Whether `value` needs checking. An empty value is an error only when
/// the field is `required`.
fn present(errors: &mut FieldErrors, field: &'static str, value: &str, required: bool) -> bool {
    if required {
        check_required(errors, field, value)
    } else {
        !value.trim().is_empty()
    }
}

/// Field rules shared by registration and profile edit
fn check_profile_fields(
    errors: &mut FieldErrors,
    form: &RegistrationForm,
    today: NaiveDate,
    required: bool,
) {
    if present(errors, "nome", &form.nome, required) && !is_valid_full_name(&form.nome) {
        errors.push("nome", ValidationError::InvalidFullName);
    }
    if present(errors, "email", &form.email, required) && !is_valid_email(form.email.trim()) {
        errors.push("email", ValidationError::InvalidEmail);
    }
    if present(errors, "telefone", &form.telefone, required) && !is_valid_phone(&form.telefone) {
        errors.push("telefone", ValidationError::InvalidPhone);
    }

    if present(errors, "cep", &form.cep, required) && !is_valid_cep(form.cep.trim()) {
        errors.push("cep", ValidationError::InvalidCep);
    }
    present(errors, "pais", &form.pais, required);
    present(errors, "estado", &form.estado, required);
    present(errors, "cidade", &form.cidade, required);
    present(errors, "rua", &form.rua, required);
    if present(errors, "numero", &form.numero, required) {
        if let Err(e) = parse_optional_number(&form.numero) {
            errors.push("numero", e);
        }
    }
    if let Err(e) = parse_optional_number(&form.apartamento) {
        errors.push("apartamento", e);
    }

    if present(errors, "cpf", &form.cpf, required) && !is_valid_cpf(&form.cpf) {
        errors.push("cpf", ValidationError::InvalidCpf);
    }
    if required || !form.data_nascimento.trim().is_empty() {
        if let Err(e) = validate_birth_date(&form.data_nascimento, today) {
            errors.push("dataNascimento", e);
        }
    }
}

/// Validate every step of the register screen at once.
pub fn validate_registration(
    form: &RegistrationForm,
    today: NaiveDate,
) -> Result<ProfileUpdate, FieldErrors> {
    let mut errors = FieldErrors::new();
    check_profile_fields(&mut errors, form, today, true);
    check_password(&mut errors, &form.senha, &form.confirmar_senha);
    errors.into_result(form.to_profile_update())
}

/// Validate a profile edit. Empty fields stay unchanged; the rest follow
/// the register rules. The password is optional as in
/// `validate_password_change`.
pub fn validate_profile_edit(
    form: &RegistrationForm,
    today: NaiveDate,
) -> Result<ProfileUpdate, FieldErrors> {
    let mut errors = FieldErrors::new();
    check_profile_fields(&mut errors, form, today, false);
    check_password_change(&mut errors, &form.senha, &form.confirmar_senha);
    errors.into_result(form.to_profile_update())
}

/// Profile edit: the new password is optional, but when given it must be
/// long enough and confirmed.
pub fn validate_password_change(senha: &str, confirmar: &str) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    check_password_change(&mut errors, senha, confirmar);
    errors.into_result(())
}

fn check_password_change(errors: &mut FieldErrors, senha: &str, confirmar: &str) {
    if senha.is_empty() && confirmar.is_empty() {
        return;
    }
    if senha.chars().count() < MIN_PASSWORD_LEN {
        errors.push("senha", ValidationError::TooShort(MIN_PASSWORD_LEN));
    }
    if senha != confirmar {
        errors.push("confirmarSenha", ValidationError::PasswordMismatch);
    }
}

/// Whether the user has filled in everything the marketplace needs beyond
/// the signup fields.
pub fn is_profile_complete(user: &User) -> bool {
    let filled = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
    filled(&user.telefone)
        && filled(&user.cpf)
        && filled(&user.data_nascimento)
        && filled(&user.pais)
        && filled(&user.estado)
        && filled(&user.cidade)
        && filled(&user.cep)
        && filled(&user.rua)
        && user.numero.is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn valid_registration() -> RegistrationForm {
        RegistrationForm {
            nome: "Ana Souza".to_string(),
            email: "ana@example.com".to_string(),
            telefone: "(81) 9 1234-5678".to_string(),
            cpf: "529.982.247-25".to_string(),
            data_nascimento: "12/04/1990".to_string(),
            pais: "Brasil".to_string(),
            estado: "PE".to_string(),
            cidade: "Recife".to_string(),
            cep: "50030-230".to_string(),
            rua: "Rua da Aurora".to_string(),
            numero: "120".to_string(),
            apartamento: String::new(),
            logradouro: String::new(),
            senha: "segredo".to_string(),
            confirmar_senha: "segredo".to_string(),
        }
    }

    #[test]
    fn test_email() {
        assert!(is_valid_email("ana@example.com"));
        assert!(is_valid_email("ana.souza+tag@mail.example.com.br"));
        assert!(!is_valid_email("ana@example"));
        assert!(!is_valid_email("ana.example.com"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("ana@.com"));
        assert!(!is_valid_email("ana souza@example.com"));
    }

    #[test]
    fn test_phone() {
        assert!(is_valid_phone("(81) 9 1234-5678"));
        assert!(!is_valid_phone("81912345678"));
        assert!(!is_valid_phone("(81) 1234-5678"));
        assert!(!is_valid_phone("(81) 9 1234-567"));
    }

    #[test]
    fn test_full_name() {
        assert!(is_valid_full_name("Ana Souza"));
        assert!(is_valid_full_name("  Ana   Maria Souza "));
        assert!(!is_valid_full_name("Ana"));
        assert!(!is_valid_full_name("Ana S"));
    }

    #[test]
    fn test_cep() {
        assert!(is_valid_cep("01001-000"));
        assert!(is_valid_cep("01001000"));
        assert!(!is_valid_cep("01001-00"));
        assert!(!is_valid_cep("0100a-000"));
        assert!(!is_valid_cep(""));
    }

    #[test]
    fn test_sign_up_collects_all_errors() {
        let form = SignUpForm {
            full_name: String::new(),
            email: "not-an-email".to_string(),
            password: "123".to_string(),
            confirm_password: "124".to_string(),
        };
        let errors = validate_sign_up(&form).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert_eq!(errors.get("nomeCompleto"), Some(&ValidationError::Required));
        assert_eq!(errors.get("email"), Some(&ValidationError::InvalidEmail));
        assert_eq!(errors.get("senha"), Some(&ValidationError::TooShort(6)));
        assert_eq!(
            errors.get("confirmarSenha"),
            Some(&ValidationError::PasswordMismatch)
        );
    }

    #[test]
    fn test_sign_up_builds_payload() {
        let form = SignUpForm {
            full_name: " Ana Souza ".to_string(),
            email: "ana@example.com".to_string(),
            password: "segredo".to_string(),
            confirm_password: "segredo".to_string(),
        };
        let payload = validate_sign_up(&form).unwrap();
        assert_eq!(payload.nome_completo, "Ana Souza");
        assert_eq!(payload.senha, "segredo");
    }

    #[test]
    fn test_registration_valid_form_builds_update() {
        let update = validate_registration(&valid_registration(), today()).unwrap();
        assert_eq!(update.data_nascimento.as_deref(), Some("1990-04-12"));
        assert_eq!(update.numero, Some(120));
        assert_eq!(update.apartamento, None);
        assert_eq!(update.logradouro, None);
        assert_eq!(update.senha.as_deref(), Some("segredo"));
    }

    #[test]
    fn test_registration_field_errors() {
        let mut form = valid_registration();
        form.cpf = "111.111.111-11".to_string();
        form.data_nascimento = "16/06/2012".to_string();
        form.numero = "12A".to_string();
        form.cidade = String::new();

        let errors = validate_registration(&form, today()).unwrap_err();
        assert_eq!(errors.get("cpf"), Some(&ValidationError::InvalidCpf));
        assert_eq!(
            errors.get("dataNascimento"),
            Some(&ValidationError::TooYoung(12))
        );
        assert_eq!(errors.get("numero"), Some(&ValidationError::NotANumber));
        assert_eq!(errors.get("cidade"), Some(&ValidationError::Required));
        assert!(errors.get("email").is_none());
    }

    #[test]
    fn test_password_change() {
        assert!(validate_password_change("", "").is_ok());
        assert!(validate_password_change("segredo", "segredo").is_ok());

        let errors = validate_password_change("abc", "").unwrap_err();
        assert_eq!(errors.get("senha"), Some(&ValidationError::TooShort(6)));
        assert_eq!(
            errors.get("confirmarSenha"),
            Some(&ValidationError::PasswordMismatch)
        );
    }

    #[test]
    fn test_profile_completeness() {
        let mut user = User::new(5, "Ana Souza", "ana@example.com");
        assert!(!is_profile_complete(&user));

        let form = valid_registration();
        form.to_profile_update().apply_to(&mut user);
        assert!(is_profile_complete(&user));

        user.rua = Some("  ".to_string());
        assert!(!is_profile_complete(&user));
    }

    #[test]
    fn test_profile_edit_checks_only_given_fields() {
        let form = RegistrationForm {
            cidade: "Recife".to_string(),
            numero: "120".to_string(),
            ..Default::default()
        };

        let update = validate_profile_edit(&form, today()).unwrap();
        assert_eq!(update.cidade.as_deref(), Some("Recife"));
        assert_eq!(update.numero, Some(120));
        assert!(update.nome.is_none());
        assert!(update.data_nascimento.is_none());
        assert!(update.senha.is_none());
    }

    #[test]
    fn test_profile_edit_applies_register_rules() {
        let form = RegistrationForm {
            nome: "Ana".to_string(),
            telefone: "(81) 1234-5678".to_string(),
            data_nascimento: "16/06/2012".to_string(),
            senha: "abc".to_string(),
            confirmar_senha: "abc".to_string(),
            ..Default::default()
        };

        let errors = validate_profile_edit(&form, today()).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert_eq!(errors.get("nome"), Some(&ValidationError::InvalidFullName));
        assert_eq!(errors.get("telefone"), Some(&ValidationError::InvalidPhone));
        assert_eq!(
            errors.get("dataNascimento"),
            Some(&ValidationError::TooYoung(12))
        );
        assert_eq!(errors.get("senha"), Some(&ValidationError::TooShort(6)));
        assert!(errors.get("cidade").is_none());
    }
}
