use rand::Rng;

use crate::error::FetchError;

use super::ValueSource;

/// In-process random numbers in an inclusive range
pub struct LocalRandomSource {
    min: i64,
    max: i64,
}

impl LocalRandomSource {
    pub fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }
}

impl ValueSource for LocalRandomSource {
    fn fetch(&self) -> Result<i64, FetchError> {
        if self.min > self.max {
            return Err(FetchError::Other(format!(
                "empty range {}..={}",
                self.min, self.max
            )));
        }
        Ok(rand::thread_rng().gen_range(self.min..=self.max))
    }

    fn name(&self) -> &'static str {
        "local"
    }
}
