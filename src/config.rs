use crate::error::{Error, Result};

const MAX_WORKERS: usize = 1024;
const MIN_STACK_SIZE: usize = 16 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    pub size: Option<usize>,
    pub name: String,
    pub background: bool,
    pub stack_size: Option<usize>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            size: None,
            name: "taskq-pool".to_string(),
            background: true,
            stack_size: None,
        }
    }
}

impl PoolConfig {
    pub fn builder() -> PoolConfigBuilder {
        PoolConfigBuilder::new()
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(n) = self.size {
            if n > MAX_WORKERS {
                return Err(Error::config(format!(
                    "size too large (max {})",
                    MAX_WORKERS
                )));
            }
        }

        if self.name.trim().is_empty() {
            return Err(Error::config("name must not be empty"));
        }

        if let Some(stack) = self.stack_size {
            if stack < MIN_STACK_SIZE {
                return Err(Error::config(format!(
                    "stack_size must be at least {} bytes",
                    MIN_STACK_SIZE
                )));
            }
        }

        Ok(())
    }

    /// Number of workers the pool starts with. Falls back to the CPU count.
    pub fn worker_count(&self) -> usize {
        self.size.unwrap_or_else(num_cpus::get)
    }
}

#[derive(Debug, Default)]
pub struct PoolConfigBuilder {
    config: PoolConfig,
}

impl PoolConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: PoolConfig::default(),
        }
    }

    pub fn size(mut self, n: usize) -> Self {
        self.config.size = Some(n);
        self
    }

    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.config.name = name.into();
        self
    }

    pub fn background(mut self, background: bool) -> Self {
        self.config.background = background;
        self
    }

    pub fn stack_size(mut self, size: usize) -> Self {
        self.config.stack_size = Some(size);
        self
    }

    pub fn build(self) -> Result<PoolConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
