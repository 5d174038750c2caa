//! Mock credential check
//!
//! Credentials are compared against a fixed in-memory table. There is no
//! hashing, no session and no expiry; the token handed back is a
//! placeholder derived from the user's role.

use std::fmt;

use serde::{Deserialize, Serialize};

/// What a logged-in user is allowed to see in the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Branch,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Branch => "branch",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Public part of a user record, as returned to the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub username: String,
    pub role: Role,
}

struct UserEntry {
    username: &'static str,
    password: &'static str,
    role: Role,
}

lazy_static::lazy_static! {
    static ref USERS: Vec<UserEntry> = vec![
        UserEntry { username: "admin", password: "adminpassword", role: Role::Admin },
        UserEntry { username: "addis_ababa_branch", password: "branchpassword", role: Role::Branch },
        UserEntry { username: "adama_branch", password: "branchpassword", role: Role::Branch },
        UserEntry { username: "mekele_branch", password: "branchpassword", role: Role::Branch },
    ];
}

/// Login request body. Absent fields are empty and never match.
#[derive(Debug, Default)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Read credentials from a parsed JSON body. Fields that are missing or
    /// not strings come out empty, so any JSON value is a failed login
    /// rather than a malformed request.
    pub fn from_json(body: &serde_json::Value) -> Self {
        let field = |name: &str| body.get(name).and_then(|v| v.as_str()).unwrap_or_default().to_string();
        Self {
            username: field("username"),
            password: field("password"),
        }
    }
}

/// Successful login response body
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: &'static str,
    pub token: String,
    pub user: User,
}

/// Look up an exact username/password match in the static table
pub fn authenticate(username: &str, password: &str) -> Option<User> {
    USERS
        .iter()
        .find(|entry| entry.username == username && entry.password == password)
        .map(|entry| User {
            username: entry.username.to_string(),
            role: entry.role,
        })
}

/// Placeholder token for a role; carries no verifiable claim
pub fn mock_token(role: Role) -> String {
    format!("mock-jwt-token-for-{}", role)
}

/// Run the credential check and build the response body on success
pub fn login(credentials: &Credentials) -> Option<LoginResponse> {
    let user = authenticate(&credentials.username, &credentials.password)?;
    Some(LoginResponse {
        message: "Login successful!",
        token: mock_token(user.role),
        user,
    })
}
