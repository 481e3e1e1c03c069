use std::{
    collections::HashMap,
    future::Future,
    io::{Error, ErrorKind},
    net::TcpStream,
    sync::Arc,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use imap::Session;
use lettre::{
    transport::smtp::{authentication::Credentials, PoolConfig},
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use native_tls::TlsStream;
use tokio::sync::Mutex;

use crate::constants::{SMTP_MAX_POOL_CONNECTIONS, SMTP_TIMEOUT_SECONDS};

/// An outbound send-session handle. The trait seam exists so the cache can be
/// exercised in tests with counting fakes instead of live SMTP connections.
#[async_trait]
pub trait SmtpHandle: Send + Sync {
    async fn send(&self, message: Message) -> Result<(), Error>;
    async fn close(&self) -> Result<(), Error>;
}

struct LettreHandle {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

#[async_trait]
impl SmtpHandle for LettreHandle {
    async fn send(&self, message: Message) -> Result<(), Error> {
        match self.transport.send(message).await {
            Ok(_) => Ok(()),
            Err(err) => Err(Error::new(
                ErrorKind::Other,
                format!("SMTP send failed: {}", err),
            )),
        }
    }

    async fn close(&self) -> Result<(), Error> {
        // lettre tears the pooled connections down when the transport drops;
        // the cache only needs the drop to happen exactly once per handle.
        Ok(())
    }
}

pub async fn create_smtp_transport(
    username: &str,
    password: &str,
    domain: &str,
    port: u16,
) -> Result<Arc<dyn SmtpHandle>, Error> {
    let creds = Credentials::new(username.to_owned(), password.to_owned());

    let builder = match AsyncSmtpTransport::<Tokio1Executor>::relay(domain) {
        Ok(builder) => builder,
        Err(err) => {
            return Err(Error::new(
                ErrorKind::Other,
                format!("SMTP transport relay failed: {}", err),
            ))
        }
    };

    let smtp_session = builder
        .port(port)
        .credentials(creds)
        .timeout(Some(Duration::from_secs(SMTP_TIMEOUT_SECONDS)))
        .pool_config(PoolConfig::new().max_size(SMTP_MAX_POOL_CONNECTIONS))
        .build();

    match smtp_session.test_connection().await {
        Ok(_) => Ok(Arc::new(LettreHandle {
            transport: smtp_session,
        })),
        Err(e) => Err(Error::new(
            ErrorKind::Other,
            format!("SMTP test connection failed: {}", e),
        )),
    }
}

pub async fn create_imap_session(
    username: &str,
    password: &str,
    domain: &str,
    port: u16,
) -> Result<Session<TlsStream<TcpStream>>, Error> {
    let tls = match native_tls::TlsConnector::builder().build() {
        Ok(val) => val,
        Err(err) => {
            return Err(Error::new(
                ErrorKind::Other,
                format!("TlsConnector build failed: {:?}", err),
            ))
        }
    };

    match imap::connect((domain.to_owned(), port), domain, &tls) {
        Ok(client) => match client.login(username, password) {
            Ok(session) => Ok(session),
            Err((err, _)) => Err(Error::new(
                ErrorKind::Other,
                format!("IMAP login failed: {:?}", err),
            )),
        },
        Err(err) => Err(Error::new(
            ErrorKind::Other,
            format!("IMAP connect failed: {:?}", err),
        )),
    }
}

type Clock = Box<dyn Fn() -> Instant + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct TransportKey {
    host: String,
    port: u16,
    user: String,
}

struct CachedTransport {
    handle: Arc<dyn SmtpHandle>,
    created_at: Instant,
}

/// Keeps one live SMTP handle per `(host, port, user)` for the TTL window,
/// so repeated sends with the same credentials skip the reconnect cost.
///
/// Eviction is lazy: only a lookup for the same key notices expiry, closes
/// the superseded handle and builds a replacement. The map mutex stays held
/// across the check/evict/create sequence, which serializes concurrent
/// callers and upholds the one-live-handle-per-key invariant.
pub struct TransportCache {
    entries: Mutex<HashMap<TransportKey, CachedTransport>>,
    ttl: Duration,
    clock: Clock,
}

impl TransportCache {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Box::new(Instant::now))
    }

    pub fn with_clock(ttl: Duration, clock: Clock) -> Self {
        TransportCache {
            entries: Mutex::new(HashMap::new()),
            ttl,
            clock,
        }
    }

    /// Returns the cached handle for the key when still fresh; otherwise
    /// closes and evicts the stale one (close failures are swallowed) and
    /// stores whatever the factory builds.
    pub async fn get_or_create<F, Fut>(
        &self,
        host: &str,
        port: u16,
        user: &str,
        factory: F,
    ) -> Result<Arc<dyn SmtpHandle>, Error>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Arc<dyn SmtpHandle>, Error>>,
    {
        let key = TransportKey {
            host: host.to_owned(),
            port,
            user: user.to_owned(),
        };
        let now = (self.clock)();

        let mut entries = self.entries.lock().await;

        if let Some(entry) = entries.get(&key) {
            if now.duration_since(entry.created_at) < self.ttl {
                return Ok(entry.handle.clone());
            }
        }

        if let Some(stale) = entries.remove(&key) {
            if let Err(err) = stale.handle.close().await {
                println!("Closing stale SMTP transport failed: {}", err);
            }
        }

        let handle = factory().await?;
        entries.insert(
            key,
            CachedTransport {
                handle: handle.clone(),
                created_at: now,
            },
        );

        Ok(handle)
    }

    /// Closes every cached handle and empties the cache.
    pub async fn shutdown_all(&self) {
        let mut entries = self.entries.lock().await;
        for (_, entry) in entries.drain() {
            if let Err(err) = entry.handle.close().await {
                println!("Closing SMTP transport failed: {}", err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    struct FakeHandle {
        closes: Arc<AtomicUsize>,
        fail_close: bool,
    }

    #[async_trait]
    impl SmtpHandle for FakeHandle {
        async fn send(&self, _message: Message) -> Result<(), Error> {
            Ok(())
        }

        async fn close(&self) -> Result<(), Error> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            if self.fail_close {
                Err(Error::new(ErrorKind::Other, "close refused"))
            } else {
                Ok(())
            }
        }
    }

    fn fake_factory(
        closes: Arc<AtomicUsize>,
        fail_close: bool,
    ) -> impl Future<Output = Result<Arc<dyn SmtpHandle>, Error>> {
        async move { Ok(Arc::new(FakeHandle { closes, fail_close }) as Arc<dyn SmtpHandle>) }
    }

    fn manual_clock() -> (Arc<StdMutex<Duration>>, Clock) {
        let offset = Arc::new(StdMutex::new(Duration::ZERO));
        let base = Instant::now();
        let shared = offset.clone();
        let clock: Clock = Box::new(move || base + *shared.lock().unwrap());
        (offset, clock)
    }

    #[tokio::test]
    async fn same_key_within_ttl_reuses_handle() {
        let (_offset, clock) = manual_clock();
        let cache = TransportCache::with_clock(Duration::from_secs(300), clock);
        let closes = Arc::new(AtomicUsize::new(0));

        let first = cache
            .get_or_create("smtp.example.com", 465, "user", || {
                fake_factory(closes.clone(), false)
            })
            .await
            .unwrap();
        let second = cache
            .get_or_create("smtp.example.com", 465, "user", || {
                fake_factory(closes.clone(), false)
            })
            .await
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(closes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn expired_entry_is_closed_once_and_replaced() {
        let (offset, clock) = manual_clock();
        let cache = TransportCache::with_clock(Duration::from_secs(300), clock);
        let closes = Arc::new(AtomicUsize::new(0));

        let first = cache
            .get_or_create("smtp.example.com", 465, "user", || {
                fake_factory(closes.clone(), false)
            })
            .await
            .unwrap();

        *offset.lock().unwrap() = Duration::from_secs(301);

        let second = cache
            .get_or_create("smtp.example.com", 465, "user", || {
                fake_factory(closes.clone(), false)
            })
            .await
            .unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn close_failure_on_eviction_is_swallowed() {
        let (offset, clock) = manual_clock();
        let cache = TransportCache::with_clock(Duration::from_secs(300), clock);
        let closes = Arc::new(AtomicUsize::new(0));

        cache
            .get_or_create("smtp.example.com", 465, "user", || {
                fake_factory(closes.clone(), true)
            })
            .await
            .unwrap();

        *offset.lock().unwrap() = Duration::from_secs(600);

        let replacement = cache
            .get_or_create("smtp.example.com", 465, "user", || {
                fake_factory(closes.clone(), false)
            })
            .await;

        assert!(replacement.is_ok());
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn distinct_users_get_distinct_handles() {
        let (_offset, clock) = manual_clock();
        let cache = TransportCache::with_clock(Duration::from_secs(300), clock);
        let closes = Arc::new(AtomicUsize::new(0));

        let alice = cache
            .get_or_create("smtp.example.com", 465, "alice", || {
                fake_factory(closes.clone(), false)
            })
            .await
            .unwrap();
        let bob = cache
            .get_or_create("smtp.example.com", 465, "bob", || {
                fake_factory(closes.clone(), false)
            })
            .await
            .unwrap();

        assert!(!Arc::ptr_eq(&alice, &bob));
    }

    #[tokio::test]
    async fn failed_factory_leaves_no_entry_behind() {
        let (_offset, clock) = manual_clock();
        let cache = TransportCache::with_clock(Duration::from_secs(300), clock);
        let closes = Arc::new(AtomicUsize::new(0));

        let failed = cache
            .get_or_create("smtp.example.com", 465, "user", || async {
                Err::<Arc<dyn SmtpHandle>, Error>(Error::new(ErrorKind::Other, "connect refused"))
            })
            .await;
        assert!(failed.is_err());

        // Next lookup builds a fresh handle instead of serving a dead one.
        let rebuilt = cache
            .get_or_create("smtp.example.com", 465, "user", || {
                fake_factory(closes.clone(), false)
            })
            .await;
        assert!(rebuilt.is_ok());
    }

    #[tokio::test]
    async fn shutdown_all_closes_every_handle() {
        let (_offset, clock) = manual_clock();
        let cache = TransportCache::with_clock(Duration::from_secs(300), clock);
        let closes = Arc::new(AtomicUsize::new(0));

        cache
            .get_or_create("smtp.example.com", 465, "alice", || {
                fake_factory(closes.clone(), false)
            })
            .await
            .unwrap();
        cache
            .get_or_create("smtp.example.com", 465, "bob", || {
                fake_factory(closes.clone(), false)
            })
            .await
            .unwrap();

        cache.shutdown_all().await;
        assert_eq!(closes.load(Ordering::SeqCst), 2);

        // The cache is usable again after shutdown.
        let fresh = cache
            .get_or_create("smtp.example.com", 465, "alice", || {
                fake_factory(closes.clone(), false)
            })
            .await;
        assert!(fresh.is_ok());
    }
}
