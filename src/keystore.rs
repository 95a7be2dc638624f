use crate::ai::ProviderKind;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// 本地密钥存储：一个扁平的 JSON 对象（供应商名 -> 密钥），
/// 相当于浏览器版的 localStorage。只在 `key` 命令时写盘。
#[derive(Debug, Clone)]
pub struct KeyStore {
    path: PathBuf,
    keys: BTreeMap<String, String>,
}

#[derive(thiserror::Error, Debug)]
pub enum KeyStoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid key file: {0}")]
    Parse(#[from] serde_json::Error),
}

impl KeyStore {
    pub fn default_path() -> PathBuf {
        std::env::var("COUNCIL_KEYS_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("council_keys.json"))
    }

    pub fn empty(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            keys: BTreeMap::new(),
        }
    }

    /// 文件不存在视为空存储；文件损坏则报错，由调用方决定怎么提示。
    pub fn load(path: impl AsRef<Path>) -> Result<Self, KeyStoreError> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Ok(Self {
                path,
                keys: BTreeMap::new(),
            });
        }
        let content = std::fs::read_to_string(&path)?;
        let keys: BTreeMap<String, String> = serde_json::from_str(&content)?;
        Ok(Self { path, keys })
    }

    pub fn save(&self) -> Result<(), KeyStoreError> {
        let content = serde_json::to_string_pretty(&self.keys)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn set(&mut self, kind: ProviderKind, key: &str) {
        self.keys
            .insert(kind.as_str().to_string(), key.trim().to_string());
    }

    /// 仅查本地存储（不含环境变量）。
    pub fn get(&self, kind: ProviderKind) -> Option<String> {
        self.keys
            .get(kind.as_str())
            .filter(|k| !k.is_empty())
            .cloned()
    }

    /// 密钥解析顺序：本地存储优先，其次该供应商的环境变量。
    pub fn resolve(&self, kind: ProviderKind) -> Option<String> {
        self.get(kind).or_else(|| {
            std::env::var(kind.env_key())
                .ok()
                .filter(|k| !k.trim().is_empty())
        })
    }

    /// 列出三个成员的密钥状态（已掩码），供 `keys` 命令展示。
    pub fn describe(&self) -> Vec<String> {
        ProviderKind::ALL
            .iter()
            .map(|kind| {
                let source = if self.get(*kind).is_some() {
                    "本地存储"
                } else if self.resolve(*kind).is_some() {
                    "环境变量"
                } else {
                    "未配置"
                };
                match self.resolve(*kind) {
                    Some(key) => format!("  {:<9} {} ({})", kind.label(), mask_key(&key), source),
                    None => format!("  {:<9} - ({})", kind.label(), source),
                }
            })
            .collect()
    }
}

/// 日志和 UI 中统一用掩码展示密钥。
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}…{}", head, tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("council-keys-test-{}-{}.json", name, std::process::id()))
    }

    #[test]
    fn missing_file_is_empty_store() {
        let store = KeyStore::load(temp_store_path("missing")).unwrap();
        assert!(store.get(ProviderKind::ChatGpt).is_none());
    }

    #[test]
    fn set_save_load_roundtrip() {
        let path = temp_store_path("roundtrip");
        let mut store = KeyStore::load(&path).unwrap();
        store.set(ProviderKind::DeepSeek, "  sk-deepseek-abc123  ");
        store.save().unwrap();

        let reloaded = KeyStore::load(&path).unwrap();
        assert_eq!(
            reloaded.get(ProviderKind::DeepSeek).as_deref(),
            Some("sk-deepseek-abc123")
        );
        assert!(reloaded.get(ProviderKind::Gemini).is_none());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn corrupt_file_is_an_error_not_a_panic() {
        let path = temp_store_path("corrupt");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            KeyStore::load(&path),
            Err(KeyStoreError::Parse(_))
        ));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn stored_key_wins_over_env() {
        let path = temp_store_path("precedence");
        std::env::set_var("GEMINI_API_KEY", "env-key-0000000000");
        let mut store = KeyStore::load(&path).unwrap();
        assert_eq!(
            store.resolve(ProviderKind::Gemini).as_deref(),
            Some("env-key-0000000000")
        );

        store.set(ProviderKind::Gemini, "stored-key-111111");
        assert_eq!(
            store.resolve(ProviderKind::Gemini).as_deref(),
            Some("stored-key-111111")
        );
        std::env::remove_var("GEMINI_API_KEY");
    }

    #[test]
    fn masking_never_reveals_short_keys() {
        assert_eq!(mask_key("short"), "****");
        assert_eq!(mask_key("sk-abcdefghijklmnop"), "sk-a…mnop");
    }
}
