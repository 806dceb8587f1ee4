use serde::{Deserialize, Serialize};

/// A marketplace user as returned by `/usuarios` and `/auth/login`.
///
/// Only `id`, `nome` and `email` are collected at signup; the rest is
/// filled in later through a profile update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub nome: String,
    pub email: String,
    #[serde(default)]
    pub telefone: Option<String>,
    #[serde(default)]
    pub cpf: Option<String>,
    /// ISO date (`YYYY-MM-DD`)
    #[serde(default)]
    pub data_nascimento: Option<String>,
    #[serde(default)]
    pub pais: Option<String>,
    #[serde(default)]
    pub estado: Option<String>,
    #[serde(default)]
    pub cidade: Option<String>,
    #[serde(default)]
    pub cep: Option<String>,
    #[serde(default)]
    pub rua: Option<String>,
    #[serde(default)]
    pub numero: Option<i64>,
    #[serde(default)]
    pub apartamento: Option<i64>,
    #[serde(default)]
    pub logradouro: Option<String>,
    #[serde(default)]
    pub imagem_perfil: Option<String>,
    #[serde(default)]
    pub ativo: bool,
    #[serde(default)]
    pub prestador_servico: bool,
}

impl User {
    pub fn new(id: i64, nome: &str, email: &str) -> Self {
        Self {
            id,
            nome: nome.to_string(),
            email: email.to_string(),
            ..Default::default()
        }
    }
}

/// Initial signup data; everything else is added after login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpPayload {
    pub nome_completo: String,
    pub email: String,
    pub senha: String,
}

/// Partial user for `PUT /usuarios`. Unset fields are omitted from the JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nome: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telefone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpf: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_nascimento: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pais: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estado: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cidade: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cep: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rua: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numero: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apartamento: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logradouro: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imagem_perfil: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub senha: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmar_senha: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merge the set fields into a cached user. Passwords are never cached.
    pub fn apply_to(&self, user: &mut User) {
        fn merge<T: Clone>(target: &mut Option<T>, value: &Option<T>) {
            if value.is_some() {
                target.clone_from(value);
            }
        }

        if let Some(ref nome) = self.nome {
            user.nome = nome.clone();
        }
        if let Some(ref email) = self.email {
            user.email = email.clone();
        }
        merge(&mut user.telefone, &self.telefone);
        merge(&mut user.cpf, &self.cpf);
        merge(&mut user.data_nascimento, &self.data_nascimento);
        merge(&mut user.pais, &self.pais);
        merge(&mut user.estado, &self.estado);
        merge(&mut user.cidade, &self.cidade);
        merge(&mut user.cep, &self.cep);
        merge(&mut user.rua, &self.rua);
        merge(&mut user.numero, &self.numero);
        merge(&mut user.apartamento, &self.apartamento);
        merge(&mut user.logradouro, &self.logradouro);
        merge(&mut user.imagem_perfil, &self.imagem_perfil);
    }
}

/// Address resolved from a CEP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub cep: String,
    pub rua: String,
    pub cidade: String,
    pub estado: String,
    pub pais: String,
}
