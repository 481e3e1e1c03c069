use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug)]
pub struct SignInMessage {
    pub email: String,
    pub password: String,
    pub domain: String,
}

impl SignInMessage {
    pub fn imap_host(&self) -> String {
        format!("imap.{}", &self.domain)
    }

    pub fn smtp_host(&self) -> String {
        format!("smtp.{}", &self.domain)
    }
}
