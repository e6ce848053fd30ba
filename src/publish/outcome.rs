use crate::error::AppError;

/// Итог стадии конвейера.
///
/// Восстановимые ошибки деградируют одну картинку, фатальные
/// останавливают публикацию.
#[derive(Debug)]
pub enum StageOutcome<T> {
    Success(T),
    Recoverable(AppError),
    Fatal(AppError),
}

impl<T> StageOutcome<T> {
    /// Раскладывает результат по классификации [`AppError::is_fatal`]
    pub fn classify(result: Result<T, AppError>) -> Self {
        match result {
            Ok(value) => StageOutcome::Success(value),
            Err(e) if e.is_fatal() => StageOutcome::Fatal(e),
            Err(e) => StageOutcome::Recoverable(e),
        }
    }

    /// Для стадий, где любая ошибка деградирует, а не прерывает
    pub fn recoverable(result: Result<T, AppError>) -> Self {
        match result {
            Ok(value) => StageOutcome::Success(value),
            Err(e) => StageOutcome::Recoverable(e),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, StageOutcome::Success(_))
    }

    pub fn success(&self) -> Option<&T> {
        match self {
            StageOutcome::Success(value) => Some(value),
            _ => None,
        }
    }
}
