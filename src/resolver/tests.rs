//! Resolver Module Tests
//!
//! ## Test Scopes
//! - **Policies**: round-robin fairness, sticky affinity, random bounds.
//! - **Cache**: hot-path behaviour, stale-but-available on refresh failure, expiry.
//! - **Failover**: bounded attempts, which errors are retried.
//! - **End-to-end**: real registry router + reqwest clients on loopback sockets.

#[cfg(test)]
mod tests {
    use crate::api;
    use crate::config::ResolverConfig;
    use crate::error::{ResolverError, TransportError};
    use crate::registry::{RegistryStore, ServiceInstance};
    use crate::resolver::policy::{PolicyKind, Random, RoundRobin, SelectionContext, SelectionPolicy, StickyByKey};
    use crate::resolver::{RegistryClient, RegistryLookup, RequestExecutor, Resolver, Response};

    use async_trait::async_trait;
    use std::collections::{HashMap, HashSet};
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    // ============================================================
    // FAKES
    // ============================================================

    #[derive(Default)]
    struct FakeLookup {
        responses: Mutex<HashMap<String, Result<Vec<ServiceInstance>, TransportError>>>,
        delay: Mutex<Duration>,
        calls: AtomicUsize,
    }

    impl FakeLookup {
        fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        fn set(&self, service: &str, instances: Vec<ServiceInstance>) {
            self.responses
                .lock()
                .unwrap()
                .insert(service.to_string(), Ok(instances));
        }

        fn fail(&self, service: &str) {
            self.responses.lock().unwrap().insert(
                service.to_string(),
                Err(TransportError::Connect {
                    target: "registry".to_string(),
                    message: "connection refused".to_string(),
                }),
            );
        }

        fn set_delay(&self, delay: Duration) {
            *self.delay.lock().unwrap() = delay;
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RegistryLookup for FakeLookup {
        async fn fetch_instances(&self, service_name: &str) -> Result<Vec<ServiceInstance>, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let delay = *self.delay.lock().unwrap();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            self.responses
                .lock()
                .unwrap()
                .get(service_name)
                .cloned()
                .unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    #[derive(Default)]
    struct FakeExecutor {
        unreachable: Mutex<HashSet<String>>,
        undecodable: Mutex<HashSet<String>>,
        server_errors: Mutex<HashSet<String>>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeExecutor {
        fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        fn unreachable(&self, address: &str) {
            self.unreachable.lock().unwrap().insert(address.to_string());
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RequestExecutor for FakeExecutor {
        async fn execute(&self, host: &str, port: u16, path: &str) -> Result<Response, TransportError> {
            let address = format!("{}:{}", host, port);
            self.calls.lock().unwrap().push(address.clone());

            if self.unreachable.lock().unwrap().contains(&address) {
                return Err(TransportError::Connect {
                    target: address,
                    message: "connection refused".to_string(),
                });
            }
            if self.undecodable.lock().unwrap().contains(&address) {
                return Err(TransportError::Decode {
                    target: address,
                    message: "truncated body".to_string(),
                });
            }
            if self.server_errors.lock().unwrap().contains(&address) {
                return Ok(Response {
                    status: 500,
                    body: "boom".to_string(),
                });
            }

            Ok(Response {
                status: 200,
                body: format!("{} from {}", path, address),
            })
        }
    }

    fn up(id: &str, host: &str, port: u16) -> ServiceInstance {
        let mut instance = ServiceInstance::new("product", id, host, port);
        instance.status = crate::registry::InstanceStatus::Up;
        instance
    }

    fn config() -> ResolverConfig {
        ResolverConfig {
            refresh_timeout: Duration::from_millis(200),
            cache_ttl: Duration::from_secs(60),
            ..ResolverConfig::default()
        }
    }

    fn resolver_with(
        config: ResolverConfig,
        lookup: &Arc<FakeLookup>,
        executor: &Arc<FakeExecutor>,
    ) -> Arc<Resolver> {
        Resolver::new(config, lookup.clone(), executor.clone()).unwrap()
    }

    // ============================================================
    // POLICY TESTS
    // ============================================================

    #[test]
    fn test_round_robin_wraps_around() {
        let instances = vec![up("a", "h", 1), up("b", "h", 2), up("c", "h", 3)];
        let cursor = AtomicUsize::new(0);
        let ctx = SelectionContext {
            next_index: &cursor,
            key: None,
        };

        let picks: Vec<usize> = (0..7).map(|_| RoundRobin.select(&instances, &ctx)).collect();
        assert_eq!(picks, vec![0, 1, 2, 0, 1, 2, 0]);
    }

    #[test]
    fn test_random_stays_in_bounds() {
        let instances = vec![up("a", "h", 1), up("b", "h", 2)];
        let cursor = AtomicUsize::new(0);
        let ctx = SelectionContext {
            next_index: &cursor,
            key: None,
        };

        for _ in 0..200 {
            assert!(Random.select(&instances, &ctx) < instances.len());
        }
    }

    #[test]
    fn test_sticky_is_stable_per_key() {
        let instances = vec![up("a", "h", 1), up("b", "h", 2), up("c", "h", 3)];
        let cursor = AtomicUsize::new(0);

        let pick = |key: &str| {
            let ctx = SelectionContext {
                next_index: &cursor,
                key: Some(key),
            };
            StickyByKey.select(&instances, &ctx)
        };

        let first = pick("customer-42");
        for _ in 0..10 {
            assert_eq!(pick("customer-42"), first);
        }
        // Keyed picks do not move the round-robin cursor
        assert_eq!(cursor.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_policy_kind_builds_named_policies() {
        assert_eq!(PolicyKind::RoundRobin.build().name(), "round-robin");
        assert_eq!(PolicyKind::Random.build().name(), "random");
        assert_eq!(PolicyKind::Sticky.build().name(), "sticky");
    }

    // ============================================================
    // RESOLUTION
    // ============================================================

    #[tokio::test]
    async fn test_round_robin_example_two_instances() {
        let lookup = FakeLookup::new();
        lookup.set("product", vec![up("A", "10.0.0.1", 8081), up("B", "10.0.0.2", 8081)]);
        let resolver = resolver_with(config(), &lookup, &FakeExecutor::new());

        let mut picks = Vec::new();
        for _ in 0..4 {
            picks.push(resolver.resolve("product").await.unwrap().instance_id);
        }

        assert_eq!(picks, vec!["A", "B", "A", "B"]);
    }

    #[tokio::test]
    async fn test_round_robin_fairness() {
        let lookup = FakeLookup::new();
        lookup.set(
            "product",
            vec![up("a", "h", 1), up("b", "h", 2), up("c", "h", 3)],
        );
        let resolver = resolver_with(config(), &lookup, &FakeExecutor::new());

        let mut counts: HashMap<String, usize> = HashMap::new();
        for _ in 0..30 {
            let instance = resolver.resolve("product").await.unwrap();
            *counts.entry(instance.instance_id).or_insert(0) += 1;
        }

        assert_eq!(counts.len(), 3);
        assert!(counts.values().all(|count| *count == 10), "{:?}", counts);
    }

    #[tokio::test]
    async fn test_cache_hit_does_not_touch_registry() {
        let lookup = FakeLookup::new();
        lookup.set("product", vec![up("a", "h", 1)]);
        let resolver = resolver_with(config(), &lookup, &FakeExecutor::new());

        for _ in 0..50 {
            resolver.resolve("product").await.unwrap();
        }

        assert_eq!(lookup.calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_cache_and_failed_refresh_is_no_instances() {
        let lookup = FakeLookup::new();
        lookup.fail("product");
        let resolver = resolver_with(config(), &lookup, &FakeExecutor::new());

        let err = resolver.resolve("product").await.unwrap_err();
        assert_eq!(err, ResolverError::NoInstancesAvailable("product".to_string()));
    }

    #[tokio::test]
    async fn test_unknown_service_is_no_instances() {
        let lookup = FakeLookup::new();
        let resolver = resolver_with(config(), &lookup, &FakeExecutor::new());

        assert!(matches!(
            resolver.resolve("ghost").await,
            Err(ResolverError::NoInstancesAvailable(_))
        ));
    }

    #[tokio::test]
    async fn test_stale_cache_survives_failed_refresh() {
        let lookup = FakeLookup::new();
        lookup.set("product", vec![up("a", "10.0.0.1", 8081)]);
        let resolver = resolver_with(config(), &lookup, &FakeExecutor::new());
        resolver.resolve("product").await.unwrap();

        lookup.fail("product");
        assert!(resolver.refresh("product").await.is_err());

        let instance = resolver.resolve("product").await.unwrap();
        assert_eq!(instance.instance_id, "a");
        assert_eq!(resolver.cached_instances("product").len(), 1);
    }

    #[tokio::test]
    async fn test_refresh_timeout_keeps_stale_cache() {
        let lookup = FakeLookup::new();
        lookup.set("product", vec![up("a", "10.0.0.1", 8081)]);
        let resolver = resolver_with(
            ResolverConfig {
                refresh_timeout: Duration::from_millis(50),
                ..config()
            },
            &lookup,
            &FakeExecutor::new(),
        );
        resolver.resolve("product").await.unwrap();

        lookup.set("product", vec![up("b", "10.0.0.2", 8081)]);
        lookup.set_delay(Duration::from_millis(500));

        let err = resolver.refresh("product").await.unwrap_err();
        assert!(matches!(err, TransportError::Timeout { .. }));
        assert_eq!(resolver.resolve("product").await.unwrap().instance_id, "a");
    }

    #[tokio::test]
    async fn test_successful_empty_refresh_clears_cache() {
        let lookup = FakeLookup::new();
        lookup.set("product", vec![up("a", "10.0.0.1", 8081)]);
        let resolver = resolver_with(config(), &lookup, &FakeExecutor::new());
        resolver.resolve("product").await.unwrap();

        lookup.set("product", Vec::new());
        assert_eq!(resolver.refresh("product").await.unwrap(), 0);

        assert!(matches!(
            resolver.resolve("product").await,
            Err(ResolverError::NoInstancesAvailable(_))
        ));
    }

    #[tokio::test]
    async fn test_expired_entry_is_served_and_revalidated() {
        let lookup = FakeLookup::new();
        lookup.set("product", vec![up("a", "10.0.0.1", 8081)]);
        let resolver = resolver_with(
            ResolverConfig {
                cache_ttl: Duration::from_millis(10),
                ..config()
            },
            &lookup,
            &FakeExecutor::new(),
        );
        resolver.resolve("product").await.unwrap();

        lookup.set("product", vec![up("b", "10.0.0.2", 8081)]);
        tokio::time::sleep(Duration::from_millis(30)).await;

        // Served from the stale snapshot, refreshed behind the caller's back
        assert_eq!(resolver.resolve("product").await.unwrap().instance_id, "a");
        resolver.shutdown().await;

        assert_eq!(lookup.calls(), 2);
        assert_eq!(resolver.cached_instances("product")[0].instance_id, "b");
    }

    #[tokio::test]
    async fn test_concurrent_misses_share_one_lookup() {
        let lookup = FakeLookup::new();
        lookup.set("product", vec![up("a", "10.0.0.1", 8081)]);
        lookup.set_delay(Duration::from_millis(50));
        let resolver = resolver_with(config(), &lookup, &FakeExecutor::new());

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..10 {
            let resolver = resolver.clone();
            tasks.spawn(async move { resolver.resolve("product").await });
        }
        while let Some(result) = tasks.join_next().await {
            assert!(result.unwrap().is_ok());
        }

        assert_eq!(lookup.calls(), 1);
    }

    #[tokio::test]
    async fn test_sticky_resolution_by_key() {
        let lookup = FakeLookup::new();
        lookup.set(
            "product",
            vec![up("a", "h", 1), up("b", "h", 2), up("c", "h", 3)],
        );
        let resolver = resolver_with(
            ResolverConfig {
                policy: PolicyKind::Sticky,
                ..config()
            },
            &lookup,
            &FakeExecutor::new(),
        );

        let first = resolver
            .resolve_with_key("product", Some("cart-7"))
            .await
            .unwrap();
        for _ in 0..5 {
            let again = resolver
                .resolve_with_key("product", Some("cart-7"))
                .await
                .unwrap();
            assert_eq!(again.instance_id, first.instance_id);
        }
    }

    #[tokio::test]
    async fn test_background_loop_refreshes_and_stops() {
        let lookup = FakeLookup::new();
        lookup.set("product", vec![up("a", "10.0.0.1", 8081)]);
        let resolver = resolver_with(
            ResolverConfig {
                refresh_interval: Duration::from_millis(20),
                ..config()
            },
            &lookup,
            &FakeExecutor::new(),
        );
        resolver.resolve("product").await.unwrap();
        resolver.start();

        lookup.set("product", vec![up("b", "10.0.0.2", 8081)]);
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(resolver.cached_instances("product")[0].instance_id, "b");

        tokio::time::timeout(Duration::from_secs(2), resolver.shutdown())
            .await
            .expect("resolver did not shut down");
        let calls = lookup.calls();
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(lookup.calls(), calls);
    }

    #[tokio::test]
    async fn test_unknown_service_entry_is_dropped_once_idle() {
        let lookup = FakeLookup::new();
        let resolver = resolver_with(
            ResolverConfig {
                cache_ttl: Duration::from_millis(10),
                ..config()
            },
            &lookup,
            &FakeExecutor::new(),
        );

        assert!(resolver.resolve("prodcut").await.is_err());
        assert_eq!(resolver.cached_services(), vec!["prodcut".to_string()]);
        assert_eq!(lookup.calls(), 1);

        tokio::time::sleep(Duration::from_millis(30)).await;
        for _ in 0..3 {
            resolver.refresh_all().await;
        }

        assert!(resolver.cached_services().is_empty());
        assert_eq!(lookup.calls(), 1);
    }

    #[tokio::test]
    async fn test_recently_used_empty_entry_is_still_polled() {
        let lookup = FakeLookup::new();
        let resolver = resolver_with(config(), &lookup, &FakeExecutor::new());

        assert!(resolver.resolve("product").await.is_err());
        lookup.set("product", vec![up("a", "10.0.0.1", 8081)]);
        resolver.refresh_all().await;

        assert_eq!(lookup.calls(), 2);
        assert_eq!(resolver.resolve("product").await.unwrap().instance_id, "a");
    }

    #[tokio::test]
    async fn test_idle_entry_with_instances_is_kept() {
        let lookup = FakeLookup::new();
        lookup.set("product", vec![up("a", "10.0.0.1", 8081)]);
        let resolver = resolver_with(
            ResolverConfig {
                cache_ttl: Duration::from_millis(10),
                ..config()
            },
            &lookup,
            &FakeExecutor::new(),
        );
        resolver.resolve("product").await.unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;
        resolver.refresh_all().await;

        assert_eq!(resolver.cached_services(), vec!["product".to_string()]);
        assert_eq!(lookup.calls(), 2);
    }

    // ============================================================
    // CALL WITH FAILOVER
    // ============================================================

    #[tokio::test]
    async fn test_call_fails_over_to_next_instance() {
        let lookup = FakeLookup::new();
        lookup.set("product", vec![up("a", "10.0.0.1", 8081), up("b", "10.0.0.2", 8081)]);
        let executor = FakeExecutor::new();
        executor.unreachable("10.0.0.1:8081");
        let resolver = resolver_with(config(), &lookup, &executor);

        let response = resolver.call("product", "/products/1").await.unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.body, "/products/1 from 10.0.0.2:8081");
        assert_eq!(executor.calls(), vec!["10.0.0.1:8081", "10.0.0.2:8081"]);
    }

    #[tokio::test]
    async fn test_call_attempts_are_bounded() {
        let lookup = FakeLookup::new();
        let instances: Vec<ServiceInstance> = (1..=5)
            .map(|i| up(&format!("i{}", i), &format!("10.0.0.{}", i), 8081))
            .collect();
        lookup.set("product", instances);
        let executor = FakeExecutor::new();
        for i in 1..=5 {
            executor.unreachable(&format!("10.0.0.{}:8081", i));
        }
        let resolver = resolver_with(config(), &lookup, &executor);

        let err = resolver.call("product", "/products/1").await.unwrap_err();

        match err {
            ResolverError::CallFailed { service, attempts, source } => {
                assert_eq!(service, "product");
                assert_eq!(attempts, 3);
                assert!(source.is_connection());
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(executor.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_call_does_not_retry_same_instance_twice() {
        let lookup = FakeLookup::new();
        lookup.set("product", vec![up("a", "10.0.0.1", 8081)]);
        let executor = FakeExecutor::new();
        executor.unreachable("10.0.0.1:8081");
        let resolver = resolver_with(config(), &lookup, &executor);

        let err = resolver.call("product", "/").await.unwrap_err();

        assert!(matches!(err, ResolverError::CallFailed { attempts: 1, .. }));
        assert_eq!(executor.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_http_error_status_is_returned_without_failover() {
        let lookup = FakeLookup::new();
        lookup.set("product", vec![up("a", "10.0.0.1", 8081), up("b", "10.0.0.2", 8081)]);
        let executor = FakeExecutor::new();
        executor
            .server_errors
            .lock()
            .unwrap()
            .insert("10.0.0.1:8081".to_string());
        let resolver = resolver_with(config(), &lookup, &executor);

        let response = resolver.call("product", "/products/1").await.unwrap();

        assert_eq!(response.status, 500);
        assert!(!response.is_success());
        assert_eq!(executor.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_decode_error_is_not_retried() {
        let lookup = FakeLookup::new();
        lookup.set("product", vec![up("a", "10.0.0.1", 8081), up("b", "10.0.0.2", 8081)]);
        let executor = FakeExecutor::new();
        executor
            .undecodable
            .lock()
            .unwrap()
            .insert("10.0.0.1:8081".to_string());
        let resolver = resolver_with(config(), &lookup, &executor);

        let err = resolver.call("product", "/products/1").await.unwrap_err();

        assert!(matches!(err, ResolverError::CallFailed { attempts: 1, .. }));
        assert_eq!(executor.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_connection_failure_triggers_refresh() {
        let lookup = FakeLookup::new();
        lookup.set("product", vec![up("a", "10.0.0.1", 8081), up("b", "10.0.0.2", 8081)]);
        let executor = FakeExecutor::new();
        executor.unreachable("10.0.0.1:8081");
        let resolver = resolver_with(config(), &lookup, &executor);

        resolver.call("product", "/").await.unwrap();
        resolver.shutdown().await;

        assert_eq!(lookup.calls(), 2);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let lookup = FakeLookup::new();
        let result = Resolver::new(
            ResolverConfig {
                max_attempts: 0,
                ..config()
            },
            lookup,
            FakeExecutor::new(),
        );
        assert!(result.is_err());
    }

    // ============================================================
    // END-TO-END (loopback sockets)
    // ============================================================

    async fn serve(app: axum::Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    async fn product_service(name: &'static str) -> SocketAddr {
        use axum::extract::Path;
        use axum::routing::get;

        let app = axum::Router::new().route(
            "/products/:id",
            get(move |Path(id): Path<String>| async move {
                format!("Product {} from instance {}", id, name)
            }),
        );
        serve(app).await
    }

    #[tokio::test]
    async fn test_end_to_end_register_resolve_and_call() {
        let store = RegistryStore::new();
        let registry_addr = serve(api::router(store.clone())).await;
        let registry_url = format!("http://{}", registry_addr);

        let provider_addr = product_service("p1").await;
        let client = RegistryClient::new(&registry_url, Duration::from_secs(2));
        let instance = ServiceInstance::new("product-service", "product-service:p1", "127.0.0.1", provider_addr.port());
        client.register(&instance).await.unwrap();
        client
            .renew("product-service", "product-service:p1")
            .await
            .unwrap();

        let resolver = Resolver::from_config(ResolverConfig::new(&registry_url)).unwrap();

        let resolved = resolver.resolve("product-service").await.unwrap();
        assert_eq!(resolved.port, provider_addr.port());

        let response = resolver
            .call("product-service", "/products/42")
            .await
            .unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body, "Product 42 from instance p1");

        client
            .deregister("product-service", "product-service:p1")
            .await
            .unwrap();
        assert_eq!(resolver.refresh("product-service").await.unwrap(), 0);
        assert!(matches!(
            resolver.resolve("product-service").await,
            Err(ResolverError::NoInstancesAvailable(_))
        ));

        resolver.shutdown().await;
    }

    #[tokio::test]
    async fn test_end_to_end_failover_past_dead_instance() {
        let store = RegistryStore::new();
        let registry_addr = serve(api::router(store.clone())).await;
        let registry_url = format!("http://{}", registry_addr);

        // A port nobody listens on: bind, read the port, drop the listener.
        let dead_port = {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };
        let live_addr = product_service("live").await;

        let client = RegistryClient::new(&registry_url, Duration::from_secs(2));
        for (id, port) in [("a-dead", dead_port), ("b-live", live_addr.port())] {
            client
                .register(&ServiceInstance::new("product-service", id, "127.0.0.1", port))
                .await
                .unwrap();
            client.renew("product-service", id).await.unwrap();
        }

        let resolver = Resolver::from_config(ResolverConfig::new(&registry_url)).unwrap();

        // Round robin starts at the dead instance ("a-dead" sorts first)
        let response = resolver
            .call("product-service", "/products/7")
            .await
            .unwrap();
        assert_eq!(response.body, "Product 7 from instance live");

        resolver.shutdown().await;
    }

    #[tokio::test]
    async fn test_lookup_keeps_reserved_characters_inside_the_name() {
        let store = RegistryStore::new();
        store
            .register(ServiceInstance::new("product", "p1", "10.0.0.1", 8081))
            .unwrap();
        store.renew("product", "p1").unwrap();
        let registry_addr = serve(api::router(store.clone())).await;

        let client = RegistryClient::new(&format!("http://{}", registry_addr), Duration::from_secs(2));

        assert!(client.fetch_instances("product?v=2").await.unwrap().is_empty());
        assert!(client.fetch_instances("team/orders").await.unwrap().is_empty());
        assert!(client.fetch_instances("product#p1").await.unwrap().is_empty());
        assert_eq!(client.fetch_instances("product").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_provider_calls_round_trip_encoded_names() {
        let store = RegistryStore::new();
        let registry_addr = serve(api::router(store.clone())).await;
        let client = RegistryClient::new(&format!("http://{}", registry_addr), Duration::from_secs(2));

        let instance = ServiceInstance::new("team/orders", "node?1", "127.0.0.1", 9000);
        client.register(&instance).await.unwrap();
        client.renew("team/orders", "node?1").await.unwrap();

        let listed = store.list_instances("team/orders");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].instance_id, "node?1");
        assert!(store.list_instances("team").is_empty());

        client.deregister("team/orders", "node?1").await.unwrap();
        assert!(store.get("team/orders", "node?1").is_none());
    }

    #[tokio::test]
    async fn test_registry_unreachable_yields_no_instances() {
        let dead_port = {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };
        let resolver = Resolver::from_config(ResolverConfig::new(format!(
            "http://127.0.0.1:{}",
            dead_port
        )))
        .unwrap();

        assert!(matches!(
            resolver.resolve("product-service").await,
            Err(ResolverError::NoInstancesAvailable(_))
        ));
    }
}
