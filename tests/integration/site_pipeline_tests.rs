use super::*;
use dealmon::plugins::checkers::FrysChecker;
use dealmon::{CheckerRegistry, DealMon};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PRODUCT_PAGE: &str = r#"
    <html><body>
        <label class="product_title"><b>Samsung 850 EVO 500GB SSD</b></label>
        <label id="l_price1_value_8911983">$45.00</label>
    </body></html>
"#;

const STORES_PAGE: &str = r#"
    <html><body><table>
        <tr>
            <td><input type="radio" onclick="pick(1)" id="s1" name="store" value="1"></td>
            <td class="storeTD">Store A (map)</td>
            <td class="sStatusTD">Available</td>
        </tr>
    </table></body></html>
"#;

const STORES_PATH: &str = "/template/product/product_text_normal/nearby_stores.jsp";

/// The default registry only knows real hostnames; route the mock server to the Fry's
/// adapter instead.
fn local_registry() -> CheckerRegistry {
    let mut registry = CheckerRegistry::new();
    registry
        .register("frys", r"127\.0\.0\.1", |config, settings| {
            Ok(Box::new(FrysChecker::new(config, settings)?) as CheckerBox)
        })
        .unwrap();
    registry
}

fn config_for(server: &MockServer, retry_attempts: usize) -> AppConfig {
    AppConfig::from_value(json!({
        "settings": {
            "global_product_settings": {
                "rules": {
                    "price_below_usd": 50,
                    "stores": ["Store A"],
                    "stock": "available",
                    "zip_code": 95131
                },
                "check_interval_m": 30,
                "check_interval_jitter_m": 5
            },
            "email": {
                "enabled": true,
                "alert_list": ["me@example.com"],
                "cooldown_m": 60,
                "smtp_mailer": { "server": "smtp.example.com", "login": "alerts@example.com" }
            },
            "scraper": { "retry_attempts": retry_attempts, "retry_delay_ms": 1 }
        },
        "products": {
            "ssd": { "link": format!("{}/product/8911983", server.uri()) },
            "unsupported": { "link": "https://www.example.com/item/1" }
        }
    }))
    .unwrap()
}

async fn mount_site(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/product/8911983"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PRODUCT_PAGE))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(STORES_PATH))
        .and(query_param("zipcode", "95131"))
        .and(query_param("plu", "8911983"))
        .respond_with(ResponseTemplate::new(200).set_body_string(STORES_PAGE))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_configured_product_is_checked_and_alerted() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    mount_site(&server).await;

    let transport = Arc::new(RecordingTransport::default());
    let mut monitor = DealMon::new(&config_for(&server, 0), &local_registry(), transport.clone());
    assert_eq!(monitor.labels(), &["ssd".to_string()]);

    let outcomes = monitor.run_once().await?;
    let result = outcomes[0].result.as_ref().unwrap();
    assert!(result.deal);
    assert_eq!(result.name, "Samsung 850 EVO 500GB SSD");
    assert_eq!(result.stores, vec!["Store A"]);
    assert_eq!(result.criteria.zip_code, "95131");

    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "me@example.com");
    assert!(sent[0].body.contains("Price below: $50"));
    Ok(())
}

#[tokio::test]
async fn test_transient_server_error_is_retried() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/product/8911983"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    mount_site(&server).await;

    let transport = Arc::new(RecordingTransport::default());
    let mut monitor = DealMon::new(&config_for(&server, 2), &local_registry(), transport.clone());

    let outcomes = monitor.run_once().await?;
    assert!(outcomes[0].result.as_ref().is_ok_and(|r| r.deal));
    Ok(())
}

#[tokio::test]
async fn test_unreachable_site_fails_without_alert() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let transport = Arc::new(RecordingTransport::default());
    let mut monitor = DealMon::new(&config_for(&server, 0), &local_registry(), transport.clone());

    let outcomes = monitor.run_once().await?;
    assert!(matches!(outcomes[0].result, Err(AppError::Http(_))));
    assert!(transport.sent().is_empty());
    Ok(())
}
