use std::collections::HashMap;
use std::sync::Arc;

/// Read-only configuration values served by `CONFIG GET`. Built once at
/// process start from command line flags; the server core never parses flags
/// itself.
#[derive(Clone, Debug, Default)]
pub struct Settings {
    values: Arc<HashMap<String, String>>,
}

impl Settings {
    pub fn new(dir: String, dbfilename: String) -> Settings {
        let values = HashMap::from([
            ("dir".to_string(), dir),
            ("dbfilename".to_string(), dbfilename),
        ]);

        Settings {
            values: Arc::new(values),
        }
    }

    pub fn get(&self, parameter: &str) -> Option<&str> {
        self.values.get(parameter).map(String::as_str)
    }
}
