//! Page-object flows driven against the mock session through the public API.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use steadyhand::prelude::*;
use steadyhand::scripts::CLICK_SCRIPT;

const SELECTORS: &str = r##"{
    "header": {
        "login_link": {
            "primary": ".ico-login",
            "secondary": "a[href='/login']",
            "xpath": "//a[text()='Log in']",
            "stability": "High"
        },
        "cart_qty": { "primary": ".cart-qty", "stability": "Medium" }
    },
    "login": {
        "email": { "primary": "#Email" },
        "password": { "primary": "#Password" },
        "submit": { "primary": "button.login-button", "xpath": "//button[@type='submit']" }
    },
    "product": {
        "add_to_cart": { "primary": "#add-to-cart-button-4" },
        "quantity": { "primary": "input[name='EnteredQuantity']" },
        "size": { "primary": "#product_attribute_5" }
    },
    "notification": {
        "loading": { "primary": ".ajax-loading-block-window" }
    }
}"##;

const CONFIG: &str = "
explicit_timeout_ms: 1000
page_load_timeout_ms: 1000
poll_interval_ms: 20
stability_quiet_ms: 60
retry:
  max_attempts: 3
  delay_ms: 10
settle:
  loading_indicators: ['.ajax-loading-block-window']
";

fn fixture() -> (SyncConfig, SelectorCatalog) {
    let config = SyncConfig::from_yaml_str(CONFIG).unwrap();
    config.validate().unwrap();
    (config, SelectorCatalog::from_json_str(SELECTORS).unwrap())
}

/// Minimal page object over any session
struct LoginPage<'s> {
    session: &'s dyn AutomationSession,
    config: &'s SyncConfig,
    catalog: &'s SelectorCatalog,
}

impl<'s> LoginPage<'s> {
    fn waiter(&self) -> Waiter<'s> {
        Waiter::with_spec(self.session, WaitSpec::from_config(self.config).unwrap())
    }

    fn executor(&self) -> ActionExecutor<'s> {
        ActionExecutor::from_config(self.session, self.config).unwrap()
    }

    fn log_in(&self, email: &str, password: &str) -> SteadyResult<String> {
        let email_field = self.catalog.locator_set("login.email")?;
        self.waiter().for_visible(&email_field)?;

        let executor = self.executor();
        executor.set_value(&email_field, email).into_result()?;
        executor
            .set_value(&self.catalog.locator_set("login.password")?, password)
            .into_result()?;

        let original = self.session.current_url()?;
        executor
            .click(&self.catalog.locator_set("login.submit")?)
            .into_result()?;
        self.waiter().for_url_change(&original)
    }
}

#[test]
fn login_flow_fills_fields_and_follows_redirect() {
    let (config, catalog) = fixture();
    let session = MockSession::new();
    let email = session.add_element(&Locator::id("Email"), MockElement::new());
    let password = session.add_element(&Locator::id("Password"), MockElement::new());
    // Primary submit selector is stale after a redesign; only the XPath matches.
    let submit = session.add_element(
        &Locator::xpath("//button[@type='submit']"),
        MockElement::new(),
    );
    session.queue_urls(["https://shop.test/login", "https://shop.test/login", "https://shop.test/"]);

    let page = LoginPage {
        session: &session,
        config: &config,
        catalog: &catalog,
    };
    let landed = page.log_in("user@shop.test", "secret").unwrap();

    assert_eq!(landed, "https://shop.test/");
    assert_eq!(session.attribute_of(&email, "value").as_deref(), Some("user@shop.test"));
    assert_eq!(session.attribute_of(&password, "value").as_deref(), Some("secret"));
    assert_eq!(session.clicks(&submit), 1);
}

#[test]
fn header_link_resolves_through_fallback_chain() {
    let (config, catalog) = fixture();
    let session = MockSession::new();
    let link = session.add_element(&Locator::css("a[href='/login']"), MockElement::new());

    let set = catalog.locator_set("header.login_link").unwrap();
    assert_eq!(catalog.stability("header.login_link").unwrap(), Stability::High);

    let waiter = Waiter::with_spec(&session, WaitSpec::from_config(&config).unwrap());
    assert_eq!(waiter.for_clickable(&set).unwrap(), link);
    assert_eq!(
        set.resolve(&session).unwrap(),
        Resolution::Found {
            element: link,
            locator_index: 1
        }
    );
}

#[test]
fn add_to_cart_survives_overlay_and_waits_for_ajax() {
    let (config, catalog) = fixture();
    let session = MockSession::new();
    let button = session.add_element(&Locator::id("add-to-cart-button-4"), MockElement::new());
    session.queue_invoke_failures(
        &button,
        [SessionError::intercepted("element click intercepted by .bar-notification")],
    );
    session.add_element(
        &Locator::css(".ajax-loading-block-window"),
        MockElement::new().with_visibility([true, true, false]),
    );
    session.set_pending_requests(Some(0));
    session.queue_pending_requests([Some(2), Some(1), Some(0)]);
    session.add_element(
        &Locator::class_name("cart-qty"),
        MockElement::new().with_texts(["(0)", "(1)"]),
    );

    let detector = SettledDetector::from_config(&session, &config).unwrap();
    let result = ActionExecutor::from_config(&session, &config)
        .unwrap()
        .perform_and_settle(
            &catalog.locator_set("product.add_to_cart").unwrap(),
            &Action::Click,
            &detector,
        );

    assert!(result.is_success());
    assert!(result.used_fallback());
    assert_eq!(result.attempts_used(), 1);
    assert_eq!(session.script_calls(CLICK_SCRIPT), 1);
    assert!(detector.is_settled());

    let stable = StabilityWaiter::from_config(&session, &config)
        .wait_stable_default(&catalog.locator_set("header.cart_qty").unwrap())
        .unwrap();
    assert_eq!(stable, "(1)");
}

#[test]
fn stale_quantity_field_is_re_resolved() {
    let (config, catalog) = fixture();
    let session = MockSession::new();
    let quantity = catalog.locator_set("product.quantity").unwrap();
    let field = session.add_element(quantity.primary(), MockElement::new());
    session.queue_invoke_failures(&field, [SessionError::stale("element is not attached")]);

    let result = ActionExecutor::from_config(&session, &config)
        .unwrap()
        .set_value(&quantity, "2");

    assert!(result.is_success());
    assert!(!result.used_fallback());
    assert_eq!(result.attempts_used(), 2);
    assert_eq!(session.lookup_count(quantity.primary()), 2);
    assert_eq!(session.attribute_of(&field, "value").as_deref(), Some("2"));
}

#[test]
fn re_rendered_field_is_found_again() {
    let (config, catalog) = fixture();
    let session = MockSession::new();
    let quantity = catalog.locator_set("product.quantity").unwrap();
    let original = session.add_element(quantity.primary(), MockElement::new());
    let replacement = session.rerender(&original);

    assert!(matches!(
        session.invoke(&original, &Action::Click),
        Err(ref err) if err.kind() == SessionErrorKind::StaleElement
    ));
    let result = ActionExecutor::from_config(&session, &config)
        .unwrap()
        .set_value(&quantity, "3");
    assert!(result.is_success());
    assert_eq!(session.attribute_of(&replacement, "value").as_deref(), Some("3"));
}

#[test]
fn select_option_by_visible_text() {
    let (config, catalog) = fixture();
    let session = MockSession::new();
    let size = session.add_element(
        &Locator::id("product_attribute_5"),
        MockElement::new().with_options(["S", "M", "L"]),
    );

    let executor = ActionExecutor::from_config(&session, &config).unwrap();
    let set = catalog.locator_set("product.size").unwrap();
    assert!(executor.select(&set, SelectOption::Text("M".into())).is_success());
    assert_eq!(session.attribute_of(&size, "value").as_deref(), Some("M"));

    let missing = executor.select(&set, SelectOption::Text("XXL".into()));
    assert!(!missing.is_success());
    assert_eq!(missing.last_failure().unwrap().class, FailureClass::NotFound);
}

#[test]
fn missing_element_times_out_with_context() {
    let (config, catalog) = fixture();
    let session = MockSession::new();
    let spec = WaitSpec::from_config(&config).unwrap().with_timeout(100).unwrap();

    let err = Waiter::with_spec(&session, spec)
        .for_visible(&catalog.locator_set("header.login_link").unwrap())
        .unwrap_err();

    assert!(err.is_timeout());
    match err {
        SteadyError::Timeout {
            timeout_ms, polls, ..
        } => {
            assert_eq!(timeout_ms, 100);
            assert!(polls >= 2);
        }
        other => panic!("expected timeout, got {other}"),
    }

    let soft = Waiter::with_spec(&session, spec)
        .soft_visible(&catalog.locator_set("header.login_link").unwrap())
        .unwrap();
    assert!(soft.is_none());
}

#[test]
fn unknown_catalog_path_is_reported() {
    let (_, catalog) = fixture();
    assert!(matches!(
        catalog.locator_set("checkout.confirm"),
        Err(SteadyError::SelectorNotFound { .. })
    ));
}
