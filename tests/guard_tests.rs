//! Guarded navigation through a fully assembled context.

mod support;

use opsdesk::cli::{self, Command};
use opsdesk::identity::AccessState;
use opsdesk::storage::{DurableStorage, USER_INFO_KEY};
use support::*;

#[tokio::test]
async fn unauthenticated_home_goes_to_login() {
    let (ctx, _) = context(StaticSource::new(&["a@x.io"], &[]));
    let out = ctx.router.push("/home").await.unwrap();
    assert_eq!(out.path, "/login");
    assert_eq!(out.redirects, vec!["/login".to_string()]);
    assert_eq!(ctx.router.current().as_deref(), Some("/login"));
}

#[tokio::test]
async fn non_admin_home_goes_to_default_landing() {
    let (ctx, _) = context(StaticSource::new(&["a@x.io"], &[]));
    ctx.session.sign_in(identity("someone@x.io", 30)).await;
    let out = ctx.router.push("/home").await.unwrap();
    assert_eq!(out.path, "/restricted");
    assert_eq!(out.name, "restricted");
}

#[tokio::test]
async fn admin_on_login_goes_to_admin_landing() {
    let (ctx, _) = context(StaticSource::new(&["A@X.io"], &[]));
    ctx.session.sign_in(identity("a@x.io", 30)).await;
    let out = ctx.router.push("/login").await.unwrap();
    assert_eq!(out.path, "/home");

    let out = ctx.router.push("/runFiles").await.unwrap();
    assert_eq!(out.path, "/runFiles");
    assert!(out.redirects.is_empty());
}

#[tokio::test]
async fn non_admin_on_login_goes_to_default_landing() {
    let (ctx, _) = context(StaticSource::new(&["a@x.io"], &[]));
    ctx.session.sign_in(identity("b@x.io", 30)).await;
    assert_eq!(ctx.router.push("/login").await.unwrap().path, "/restricted");
}

#[tokio::test]
async fn blacklisted_user_is_sent_to_login_everywhere() {
    let (ctx, _) = context(StaticSource::new(&["a@x.io", "b@x.io"], &["b@x.io"]));
    ctx.session.sign_in(identity("b@x.io", 30)).await;
    assert!(ctx.session.is_authenticated());
    assert_eq!(ctx.session.access_state(), AccessState::Blacklisted);

    for target in ["/home", "/restricted", "/settings", "/login"] {
        let out = ctx.router.push(target).await.unwrap();
        assert_eq!(out.path, "/login", "{}", target);
    }
}

#[tokio::test]
async fn directory_failure_demotes_on_next_navigation() {
    let source = StaticSource::new(&["a@x.io"], &["c@x.io"]);
    let (ctx, _) = context(source.clone());
    ctx.session.sign_in(identity("a@x.io", 30)).await;
    assert_eq!(ctx.router.push("/home").await.unwrap().path, "/home");

    source.fail("simulated network error");
    let text = cli::execute(&ctx, Command::Refresh).await.unwrap();
    assert!(text.contains("0 admins"));
    let dir = ctx.session.directory();
    assert!(dir.admin_emails.is_empty());
    assert_eq!(dir.blacklist_count(), Some(0));

    let out = ctx.router.push("/home").await.unwrap();
    assert_eq!(out.path, "/restricted");
}

#[tokio::test]
async fn root_and_unknown_paths_resolve_to_login() {
    let (ctx, _) = context(StaticSource::new(&[], &[]));
    assert_eq!(ctx.router.push("/").await.unwrap().path, "/login");
    assert_eq!(ctx.router.push("/no/such/page").await.unwrap().path, "/login");
}

#[tokio::test]
async fn wildcard_blacklist_keeps_non_admins_out_of_admin_views() {
    let (ctx, _) = context(StaticSource::new(&["a@x.io"], &["*"]));
    ctx.session.sign_in(identity("guest@x.io", 30)).await;
    assert_eq!(ctx.session.access_state(), AccessState::AuthenticatedNonAdmin);
    assert_eq!(ctx.router.push("/home").await.unwrap().path, "/restricted");

    ctx.session.sign_in(identity("a@x.io", 30)).await;
    assert_eq!(ctx.router.push("/home").await.unwrap().path, "/home");
}

#[tokio::test]
async fn guard_hydrates_persisted_identity_before_deciding() {
    let source = StaticSource::new(&["a@x.io"], &[]);
    let (ctx, storage) = context(source.clone());
    storage.set(USER_INFO_KEY, &serde_json::to_string(&identity("a@x.io", 30)).unwrap()).unwrap();

    let out = ctx.router.push("/home").await.unwrap();
    assert_eq!(out.path, "/home");
    assert!(out.redirects.is_empty());
    assert_eq!(source.calls(), 1);

    // Later navigations reuse the loaded directory.
    ctx.router.push("/settings").await.unwrap();
    assert_eq!(source.calls(), 1);
}

#[tokio::test]
async fn expired_persisted_identity_lands_on_login() {
    let (ctx, storage) = context(StaticSource::new(&["a@x.io"], &[]));
    storage.set(USER_INFO_KEY, &serde_json::to_string(&identity("a@x.io", -1)).unwrap()).unwrap();
    assert_eq!(ctx.router.push("/home").await.unwrap().path, "/login");
    assert_eq!(storage.get(USER_INFO_KEY).unwrap(), None);
}

#[tokio::test]
async fn console_login_logout_and_idle() {
    let (ctx, storage) = context(StaticSource::new(&["ops@corp.io"], &[]));

    let text = cli::execute(&ctx, cli::parse_command("login Ops@Corp.io Ops tok-9 15").unwrap()).await.unwrap();
    assert!(text.contains("AuthenticatedAdmin"), "{}", text);
    assert_eq!(ctx.router.current().as_deref(), Some("/home"));
    assert!(storage.get(USER_INFO_KEY).unwrap().is_some());

    let who = cli::execute(&ctx, Command::WhoAmI).await.unwrap();
    assert!(who.contains("Ops@Corp.io"), "{}", who);

    cli::execute(&ctx, Command::Logout).await.unwrap();
    assert_eq!(ctx.session.identity(), None);
    assert_eq!(ctx.router.current().as_deref(), Some("/login"));

    assert_eq!(cli::execute(&ctx, Command::Idle).await.unwrap(), "not signed in");
    cli::execute(&ctx, Command::Login { email: "x@corp.io".into(), name: "X".into(), token: "t".into(), ttl_minutes: 5 })
        .await
        .unwrap();
    let text = cli::execute(&ctx, Command::Idle).await.unwrap();
    assert!(text.contains("/login"), "{}", text);
    assert_eq!(ctx.router.history(), vec!["/login".to_string()]);
}

#[tokio::test]
async fn console_login_rejects_out_of_range_ttl() {
    let (ctx, storage) = context(StaticSource::new(&["a@x.io"], &[]));
    assert!(cli::parse_command("login a@x.io A tok 9223372036854775807").is_err());

    let cmd = Command::Login { email: "a@x.io".into(), name: "A".into(), token: "tok".into(), ttl_minutes: i64::MAX };
    let err = cli::execute(&ctx, cmd).await.unwrap_err();
    assert_eq!(err.code_str(), "usage");
    assert_eq!(ctx.session.identity(), None);
    assert!(storage.is_empty());
}

#[tokio::test]
async fn console_loads_and_exports_companies() {
    let (ctx, _) = context(StaticSource::new(&[], &[]));
    let tmp = tempfile::tempdir().unwrap();
    let input = tmp.path().join("companies.json");
    std::fs::write(&input, r#"[{"carrier_id": 7, "name": "North"}, {"carrier_id": 9, "name": "South"}]"#).unwrap();

    let text = cli::execute(&ctx, Command::CompaniesLoad(input)).await.unwrap();
    assert_eq!(text, "loaded 2 companies");
    assert_eq!(ctx.companies.len(), 2);

    let out = tmp.path().join("companies.csv");
    cli::execute(&ctx, Command::Export(out.clone())).await.unwrap();
    let csv = std::fs::read_to_string(&out).unwrap();
    assert_eq!(csv, "carrier_id,name\n7,North\n9,South");

    let missing = cli::execute(&ctx, Command::CompaniesLoad(tmp.path().join("nope.json"))).await.unwrap_err();
    assert_eq!(missing.code_str(), "io_error");
}
