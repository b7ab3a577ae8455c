use anyhow::{Result, anyhow};
use autoscale_cuckoo_filter::CuckooFilter;
use futures_util::StreamExt;
use moka::future::Cache;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::sync::RwLock;
use std::time::Duration;

use crate::repository::UserRepository;

/// Expected capacity and false-positive rate.
const FILTER_CAPACITY: usize = 20_000;
const FALSE_POSITIVE_RATE: f64 = 0.001;

/// Fast negative: an email not in the filter is certainly free.
static EMAIL_FILTER: Lazy<RwLock<CuckooFilter<String>>> =
    Lazy::new(|| RwLock::new(CuckooFilter::new(FILTER_CAPACITY, FALSE_POSITIVE_RATE)));

/// Fast positive: emails known to be taken.
static TAKEN_EMAILS: Lazy<Cache<String, bool>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(50_000)
        .time_to_live(Duration::from_secs(86400))
        .build()
});

#[inline]
fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Check if an email might be registered (false positives possible)
pub fn might_exist(email: &str) -> bool {
    let email = normalize(email);
    match EMAIL_FILTER.read() {
        Ok(filter) => filter.contains(&email),
        // a poisoned filter can't rule anything out
        Err(_) => true,
    }
}

/// Record a registered email in both the filter and the cache
pub async fn mark_taken(email: &str) {
    let email = normalize(email);
    if let Ok(mut filter) = EMAIL_FILTER.write() {
        if !filter.contains(&email) {
            filter.add(&email);
        }
    }
    TAKEN_EMAILS.insert(email, true).await;
}

/// Forget an email that no longer belongs to any user
pub async fn release(email: &str) {
    let email = normalize(email);
    if let Ok(mut filter) = EMAIL_FILTER.write() {
        filter.remove(&email);
    }
    TAKEN_EMAILS.invalidate(&email).await;
}

pub async fn is_taken(email: &str) -> bool {
    TAKEN_EMAILS.get(&normalize(email)).await.unwrap_or(false)
}

/// true  => email AVAILABLE
/// false => email TAKEN (or the lookup failed)
pub async fn is_email_available(email: &str, users: &dyn UserRepository) -> bool {
    if !might_exist(email) {
        return true;
    }

    if is_taken(email).await {
        return false;
    }

    match users.email_exists(&normalize(email)).await {
        Ok(true) => {
            mark_taken(email).await;
            false
        }
        Ok(false) => true,
        Err(e) => {
            tracing::error!(error = %e, "Email availability lookup failed");
            false
        }
    }
}

/// Load every registered email into the filter, streaming in batches
pub async fn warmup_email_registry(pool: &MySqlPool, batch_size: usize) -> Result<()> {
    let mut stream = sqlx::query_as::<_, (String,)>("SELECT email FROM users").fetch(pool);

    let mut batch = Vec::with_capacity(batch_size);
    let mut total = 0usize;

    while let Some(row) = stream.next().await {
        let (email,) = row.map_err(|e| anyhow!("DB row fetch failed: {}", e))?;

        batch.push(normalize(&email));
        total += 1;

        if batch.len() == batch_size {
            insert_batch(&batch)?;
            batch.clear();
        }
    }

    if !batch.is_empty() {
        insert_batch(&batch)?;
    }

    log::info!("Email registry warmup complete: {} users", total);
    Ok(())
}

fn insert_batch(emails: &[String]) -> Result<()> {
    let mut filter = EMAIL_FILTER
        .write()
        .map_err(|_| anyhow!("email filter poisoned"))?;

    for email in emails {
        filter.add(email);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MockUserRepository;

    #[actix_web::test]
    async fn unseen_email_skips_the_database() {
        let mut users = MockUserRepository::new();
        users.expect_email_exists().times(0);

        assert!(is_email_available("nunca.vista@unici.edu.mx", &users).await);
    }

    #[actix_web::test]
    async fn marked_email_is_taken_regardless_of_case() {
        let mut users = MockUserRepository::new();
        users.expect_email_exists().times(0);

        mark_taken("Rocio.Diaz@unici.edu.mx").await;

        assert!(might_exist("rocio.diaz@UNICI.edu.mx"));
        assert!(!is_email_available("ROCIO.DIAZ@unici.edu.mx", &users).await);
    }

    #[actix_web::test]
    async fn released_email_is_available_again() {
        let mut users = MockUserRepository::new();
        users.expect_email_exists().returning(|_| Ok(false));

        mark_taken("jorge.ruiz@unici.edu.mx").await;
        mark_taken("jorge.ruiz@unici.edu.mx").await;
        assert!(!is_email_available("jorge.ruiz@unici.edu.mx", &users).await);

        release("Jorge.Ruiz@unici.edu.mx").await;

        assert!(!is_taken("jorge.ruiz@unici.edu.mx").await);
        assert!(is_email_available("jorge.ruiz@unici.edu.mx", &users).await);
    }
}
