// Call Interceptor
// Times one delegate call and reports its outcome to the configured callbacks

use crate::db::traits::{DatabaseError, Value};
use crate::proxy::options::{CallRecord, Options};
use std::future::Future;
use std::time::Instant;

/// Run `call` exactly once, measure it, and dispatch the matching callback.
///
/// The delegate's result is returned untouched. A [`DatabaseError::Skip`]
/// means the call never happened on this path, so nothing is dispatched and
/// the caller's fallback reports the call instead.
pub async fn intercept<T, F>(
    options: &Options,
    query: &str,
    args: &[Value],
    call: F,
) -> Result<T, DatabaseError>
where
    F: Future<Output = Result<T, DatabaseError>>,
{
    let started_at = Instant::now();
    let result = call.await;
    let duration = started_at.elapsed();

    if let Err(DatabaseError::Skip) = result {
        return result;
    }

    options.dispatch(&CallRecord {
        query,
        args,
        started_at,
        duration,
        outcome: result.as_ref().map(|_| ()),
    });

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    type Seen = Arc<Mutex<Vec<(String, Vec<Value>, Duration, bool)>>>;

    fn recording_options() -> (Options, Seen) {
        let seen: Seen = Arc::default();
        let (ok, err) = (seen.clone(), seen.clone());
        let options = Options::builder()
            .on_success(move |q, a, d| ok.lock().unwrap().push((q.to_string(), a.to_vec(), d, true)))
            .on_error(move |q, a, d, _| err.lock().unwrap().push((q.to_string(), a.to_vec(), d, false)))
            .build();
        (options, seen)
    }

    #[tokio::test]
    async fn test_success_fires_on_success_only() {
        let (options, seen) = recording_options();
        let args = [Value::Int(1)];

        let result = intercept(&options, "select $1", &args, async { Ok::<_, DatabaseError>(7) }).await;

        assert_eq!(result.unwrap(), 7);
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, "select $1");
        assert_eq!(seen[0].1, vec![Value::Int(1)]);
        assert!(seen[0].3);
    }

    #[tokio::test]
    async fn test_error_passes_through_and_fires_on_error() {
        let (options, seen) = recording_options();

        let result: Result<(), _> = intercept(&options, "bad", &[], async {
            Err(DatabaseError::QueryError("syntax".to_string()))
        })
        .await;

        assert!(matches!(result, Err(DatabaseError::QueryError(msg)) if msg == "syntax"));
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(!seen[0].3);
    }

    #[tokio::test]
    async fn test_skip_dispatches_nothing() {
        let (options, seen) = recording_options();

        let result: Result<(), _> =
            intercept(&options, "update t set v = 1", &[], async { Err(DatabaseError::Skip) }).await;

        assert!(matches!(result, Err(DatabaseError::Skip)));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duration_covers_delegate() {
        let (options, seen) = recording_options();
        let wait = Duration::from_millis(20);

        intercept(&options, "sleep", &[], async {
            tokio::time::sleep(wait).await;
            Ok::<_, DatabaseError>(())
        })
        .await
        .unwrap();

        assert!(seen.lock().unwrap()[0].2 >= wait);
    }

    #[tokio::test]
    async fn test_callback_panic_does_not_change_result() {
        let options = Options::builder()
            .on_error(|_, _, _, _| panic!("sink down"))
            .build();

        let result: Result<(), _> =
            intercept(&options, "q", &[], async { Err(DatabaseError::BadConnection) }).await;

        assert!(matches!(result, Err(DatabaseError::BadConnection)));
    }
}
