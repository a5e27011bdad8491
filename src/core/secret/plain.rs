//! Unstructured secrets: password line plus body.

use zeroize::Zeroize;

#[derive(Debug, Clone, Default)]
pub struct Plain {
    raw: String,
}

impl Drop for Plain {
    fn drop(&mut self) {
        self.raw.zeroize();
    }
}

impl Plain {
    pub fn parse(text: &str) -> Self {
        Self {
            raw: text.to_string(),
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn password(&self) -> &str {
        self.raw.split('\n').next().unwrap_or_default()
    }

    pub fn set_password(&mut self, password: &str) {
        let mut raw = password.to_string();
        match self.raw.split_once('\n') {
            Some((_, rest)) => {
                raw.push('\n');
                raw.push_str(rest);
            }
            None => raw.push('\n'),
        }
        self.raw.zeroize();
        self.raw = raw;
    }

    pub fn body(&self) -> &str {
        self.raw.split_once('\n').map(|(_, b)| b).unwrap_or_default()
    }

    pub fn append(&mut self, text: &str) {
        self.raw.push_str(text);
    }
}
