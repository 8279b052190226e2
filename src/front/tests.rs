use axum::{
    body::Body,
    http::{header, HeaderMap, Request, StatusCode},
    Router,
};
use tempfile::TempDir;
use tower::ServiceExt;

use super::{ensure_admin, new_router, AppState};
use crate::{
    config::Config,
    db::{
        tests::{invoice, memory_db},
        Catalog, Database,
    },
    models::NewUser,
};

struct TestApp {
    app: Router,
    db: Database,
    uploads: TempDir,
}

struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: String,
}

impl TestResponse {
    fn location(&self) -> &str {
        self.headers
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }

    /// `name=value` part of the `Set-Cookie` header.
    fn cookie(&self) -> Option<String> {
        self.headers
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(str::to_string)
    }
}

async fn test_app() -> TestApp {
    let db = memory_db().await;
    let uploads = tempfile::tempdir().unwrap();

    let mut config = Config::from_iter(Vec::new()).unwrap();
    config.templates_dir = concat!(env!("CARGO_MANIFEST_DIR"), "/src/front/templates").into();
    config.upload_dir = uploads.path().to_path_buf();
    ensure_admin(&db, &config).await.unwrap();

    let state = AppState::new(db.clone(), config).unwrap();
    TestApp {
        app: new_router(state),
        db,
        uploads,
    }
}

impl TestApp {
    async fn send(&self, req: Request<Body>) -> TestResponse {
        let res = self.app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let headers = res.headers().clone();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        TestResponse {
            status,
            headers,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }

    async fn get(&self, uri: &str, cookie: Option<&str>) -> TestResponse {
        let mut req = Request::get(uri);
        if let Some(cookie) = cookie {
            req = req.header(header::COOKIE, cookie);
        }
        self.send(req.body(Body::empty()).unwrap()).await
    }

    async fn post_form(&self, uri: &str, body: &str, cookie: Option<&str>) -> TestResponse {
        let mut req = Request::post(uri).header(
            header::CONTENT_TYPE,
            "application/x-www-form-urlencoded",
        );
        if let Some(cookie) = cookie {
            req = req.header(header::COOKIE, cookie);
        }
        self.send(req.body(Body::from(body.to_string())).unwrap())
            .await
    }

    async fn login(&self) -> String {
        let res = self
            .post_form("/login", "usuario=admin&senha=1234", None)
            .await;
        assert_eq!(res.status, StatusCode::SEE_OTHER);
        res.cookie().expect("session cookie")
    }

    async fn seed(&self) -> (i64, i64) {
        let project = self.db.create(Catalog::Projects, "Obra Centro").await.unwrap();
        let category = self.db.create(Catalog::Categories, "Eletrica").await.unwrap();
        (project, category)
    }
}

const BOUNDARY: &str = "obras-test-boundary";

fn multipart(fields: &[(&str, &str)], file: Option<(&str, &[u8])>) -> Request<Body> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, content)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"arquivo\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::post("/nf")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn invoice_fields<'a>(valor: &'a str, obra: &'a str, categoria: &'a str) -> Vec<(&'a str, &'a str)> {
    vec![
        ("numero", "NF-100"),
        ("valor", valor),
        ("data", "2024-03-15"),
        ("pagamento", "PIX"),
        ("observacao", "primeira parcela"),
        ("obra", obra),
        ("categoria", categoria),
    ]
}

#[tokio::test]
async fn health_check() {
    let app = test_app().await;
    let res = app.get("/", None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body, "OK");
}

#[tokio::test]
async fn wrong_password_renders_inline_error_without_session() {
    let app = test_app().await;
    let res = app
        .post_form("/login", "usuario=admin&senha=errada", None)
        .await;

    assert_eq!(res.status, StatusCode::OK);
    assert!(res.body.contains("Usuário ou senha inválidos"));
    assert!(res.cookie().is_none());

    let res = app
        .post_form("/login", "usuario=ninguem&senha=1234", None)
        .await;
    assert!(res.body.contains("Usuário ou senha inválidos"));
}

#[tokio::test]
async fn correct_login_opens_session_and_goes_home() {
    let app = test_app().await;
    let res = app
        .post_form("/login", "usuario=admin&senha=1234", None)
        .await;

    assert_eq!(res.status, StatusCode::SEE_OTHER);
    assert_eq!(res.location(), "/home");
    let cookie = res.cookie().unwrap();

    let home = app.get("/home", Some(&cookie)).await;
    assert!(home.body.contains("Olá, Administrador"));

    let res = app.get("/logout", Some(&cookie)).await;
    assert_eq!(res.location(), "/login");
    let home = app.get("/home", Some(&cookie)).await;
    assert!(!home.body.contains("Olá"));
}

#[tokio::test]
async fn blocked_account_cannot_log_in() {
    let app = test_app().await;
    let hash = super::password::hash("segredo").unwrap();
    let id = app
        .db
        .create_user(&NewUser {
            name: "Joao",
            login: "joao",
            password_hash: &hash,
        })
        .await
        .unwrap();
    app.db.set_user_active(id, false).await.unwrap();

    let res = app
        .post_form("/login", "usuario=joao&senha=segredo", None)
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert!(res.body.contains("Usuário bloqueado"));
    assert!(res.cookie().is_none());
}

#[tokio::test]
async fn user_pages_require_login() {
    let app = test_app().await;

    for res in [
        app.get("/usuarios", None).await,
        app.post_form("/usuarios", "nome=X&usuario=x&senha=1", None)
            .await,
        app.get("/bloquear/1", None).await,
        app.get("/ativar/1", None).await,
    ] {
        assert_eq!(res.status, StatusCode::SEE_OTHER);
        assert_eq!(res.location(), "/login");
    }
    assert_eq!(app.db.list_users().await.unwrap().len(), 1);
}

#[tokio::test]
async fn manage_users_with_a_session() {
    let app = test_app().await;
    let cookie = app.login().await;

    let res = app
        .post_form("/usuarios", "nome=Maria&usuario=maria&senha=abc", Some(&cookie))
        .await;
    assert_eq!(res.location(), "/usuarios");

    let res = app
        .post_form("/usuarios", "nome=Outra&usuario=maria&senha=xyz", Some(&cookie))
        .await;
    assert_eq!(res.status, StatusCode::CONFLICT);

    let list = app.get("/usuarios", Some(&cookie)).await;
    assert_eq!(list.status, StatusCode::OK);
    assert!(list.body.contains("maria"));

    let maria = app.db.find_user_by_login("maria").await.unwrap().unwrap();
    app.get(&format!("/bloquear/{}", maria.id), Some(&cookie))
        .await;
    assert!(!app.db.find_user_by_login("maria").await.unwrap().unwrap().active);
    app.get(&format!("/ativar/{}", maria.id), Some(&cookie))
        .await;
    assert!(app.db.find_user_by_login("maria").await.unwrap().unwrap().active);

    let res = app.get("/bloquear/999", Some(&cookie)).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn project_crud_and_delete_guard() {
    let app = test_app().await;

    let res = app.post_form("/obras", "nome=Residencial+Sol", None).await;
    assert_eq!(res.location(), "/obras");
    let res = app.post_form("/obras", "nome=Galpao", None).await;
    assert_eq!(res.status, StatusCode::SEE_OTHER);

    let projects = app.db.list(Catalog::Projects).await.unwrap();
    let (sol, galpao) = (projects[0].id, projects[1].id);

    app.post_form(&format!("/obras/editar/{sol}"), "nome=Residencial+Lua", None)
        .await;
    let page = app.get("/obras", None).await;
    assert!(page.body.contains("Residencial Lua"));

    let category = app.db.create(Catalog::Categories, "Cimento").await.unwrap();
    app.db
        .create_invoice(&invoice(sol, category, 10_00, "2024-03-01"))
        .await
        .unwrap();

    let res = app.post_form(&format!("/obras/excluir/{sol}"), "", None).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body, "Não é possível excluir obra com notas fiscais lançadas");

    let res = app
        .post_form(&format!("/categorias/excluir/{category}"), "", None)
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body, "Não é possível excluir categoria vinculada a notas fiscais");

    let res = app.post_form(&format!("/obras/excluir/{galpao}"), "", None).await;
    assert_eq!(res.location(), "/obras");
    assert_eq!(app.db.list(Catalog::Projects).await.unwrap().len(), 1);

    let res = app.post_form("/obras/excluir/999", "", None).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    let res = app.post_form("/categorias/editar/999", "nome=X", None).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    let res = app.post_form("/categorias", "nome=+", None).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_invoice_with_attachment() {
    let app = test_app().await;
    let (project, category) = app.seed().await;
    let (project, category) = (project.to_string(), category.to_string());

    let res = app
        .send(multipart(
            &invoice_fields("R$ 1.234,56", &project, &category),
            Some(("nota fiscal.pdf", b"%PDF-1.4 fake")),
        ))
        .await;
    assert_eq!(res.status, StatusCode::SEE_OTHER);
    assert_eq!(res.location(), "/nf");

    let stored = app.uploads.path().join("nota_fiscal.pdf");
    assert_eq!(std::fs::read(&stored).unwrap(), b"%PDF-1.4 fake");

    let invoices = app.db.list_invoices().await.unwrap();
    assert_eq!(invoices.len(), 1);
    assert_eq!(invoices[0].amount_cents, 123456);
    assert_eq!(invoices[0].file_name.as_deref(), Some("nota_fiscal.pdf"));
    assert_eq!(invoices[0].note.as_deref(), Some("primeira parcela"));

    let page = app.get("/nf", None).await;
    assert!(page.body.contains("R$ 1.234,56"));
    assert!(page.body.contains("/uploads/nota_fiscal.pdf"));

    let file = app.get("/uploads/nota_fiscal.pdf", None).await;
    assert_eq!(file.status, StatusCode::OK);
    assert_eq!(file.body, "%PDF-1.4 fake");
}

#[tokio::test]
async fn invoice_without_file_stores_no_reference() {
    let app = test_app().await;
    let (project, category) = app.seed().await;
    let (project, category) = (project.to_string(), category.to_string());

    let res = app
        .send(multipart(
            &invoice_fields("50,00", &project, &category),
            Some(("", b"")),
        ))
        .await;
    assert_eq!(res.status, StatusCode::SEE_OTHER);
    assert_eq!(app.db.list_invoices().await.unwrap()[0].file_name, None);
}

#[tokio::test]
async fn invalid_invoice_is_rejected_and_nothing_is_stored() {
    let app = test_app().await;
    let (project, category) = app.seed().await;
    let (project, category) = (project.to_string(), category.to_string());

    let res = app
        .send(multipart(
            &invoice_fields("doze", &project, &category),
            Some(("recibo.png", b"png")),
        ))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body, "Erro: valor inválido. Use ex: 1.234,56");
    assert!(!app.uploads.path().join("recibo.png").exists());

    let res = app
        .send(multipart(&invoice_fields("10,00", "999", &category), None))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body, "Obra 999 inexistente");

    let res = app
        .send(multipart(&invoice_fields("10,00", &project, "999"), None))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    assert!(app.db.list_invoices().await.unwrap().is_empty());
}

#[tokio::test]
async fn unpadded_date_is_stored_padded_and_counted_in_its_month() {
    let app = test_app().await;
    let (project, category) = app.seed().await;
    let (project, category) = (project.to_string(), category.to_string());

    let mut fields = invoice_fields("10,00", &project, &category);
    fields[2] = ("data", "2024-3-5");
    let res = app.send(multipart(&fields, None)).await;
    assert_eq!(res.status, StatusCode::SEE_OTHER);

    let mut fields = invoice_fields("20,00", &project, &category);
    fields[2] = ("data", "2024-12-01");
    app.send(multipart(&fields, None)).await;

    assert_eq!(app.db.list_invoices().await.unwrap()[0].date, "2024-03-05");

    let march = app.get("/dashboard?mes=2024-03", None).await;
    assert!(march.body.contains(r#"<dd id="total-nfs">1</dd>"#));
    assert!(march.body.contains(r#"<dd id="total-gasto">R$ 10,00</dd>"#));

    let all = app.get("/dashboard", None).await;
    assert!(all.body.contains(r#"<dd id="ultima-data">2024-12-01</dd>"#));
}

#[tokio::test]
async fn oversized_amount_is_rejected_and_dashboard_still_renders() {
    let app = test_app().await;
    let (project, category) = app.seed().await;
    let (project, category) = (project.to_string(), category.to_string());

    for _ in 0..2 {
        let res = app
            .send(multipart(
                &invoice_fields("50.000.000.000.000.000,00", &project, &category),
                None,
            ))
            .await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);
        assert_eq!(res.body, "Erro: valor inválido. Use ex: 1.234,56");
    }
    assert!(app.db.list_invoices().await.unwrap().is_empty());

    let res = app.get("/dashboard", None).await;
    assert_eq!(res.status, StatusCode::OK);
}

#[tokio::test]
async fn dashboard_aggregates_with_filters() {
    let app = test_app().await;
    let centro = app.db.create(Catalog::Projects, "Centro").await.unwrap();
    let praia = app.db.create(Catalog::Projects, "Praia").await.unwrap();
    let eletrica = app.db.create(Catalog::Categories, "Eletrica").await.unwrap();
    let pintura = app.db.create(Catalog::Categories, "Pintura").await.unwrap();

    for nf in [
        invoice(centro, eletrica, 1_000_00, "2024-03-10"),
        invoice(centro, pintura, 234_56, "2024-03-28"),
        invoice(centro, pintura, 99_00, "2024-04-02"),
        invoice(praia, eletrica, 500_00, "2024-03-01"),
    ] {
        app.db.create_invoice(&nf).await.unwrap();
    }

    let res = app
        .get(&format!("/dashboard?obra={centro}&mes=2024-03"), None)
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert!(res.body.contains(r#"<dd id="total-gasto">R$ 1.234,56</dd>"#));
    assert!(res.body.contains(r#"<dd id="total-geral">R$ 1.833,56</dd>"#));
    assert!(res.body.contains(r#"<dd id="maior-categoria">Eletrica</dd>"#));
    assert!(res.body.contains(r#"<dd id="total-nfs">2</dd>"#));
    assert!(res.body.contains(r#"<dd id="ultima-data">2024-03-28</dd>"#));
    assert!(res.body.contains(&format!(r#"<option value="{centro}" selected>"#)));

    let all = app.get("/dashboard?obra=all", None).await;
    let none = app.get("/dashboard", None).await;
    assert_eq!(all.body, none.body);
    assert!(none.body.contains(r#"<dd id="total-gasto">R$ 1.833,56</dd>"#));
    assert!(none.body.contains(r#"<dd id="ultima-data">2024-04-02</dd>"#));

    let empty = app.get("/dashboard?mes=2023-01", None).await;
    assert!(empty.body.contains(r#"<dd id="total-gasto">R$ 0,00</dd>"#));
    assert!(empty.body.contains(r#"<dd id="maior-categoria">—</dd>"#));
    assert!(empty.body.contains(r#"<dd id="ultima-data">—</dd>"#));
    assert!(empty.body.contains(r#"<dd id="total-nfs">0</dd>"#));
}

#[tokio::test]
async fn export_lists_every_invoice() {
    let app = test_app().await;
    let (project, category) = app.seed().await;
    app.db
        .create_invoice(&invoice(project, category, 123456, "2024-03-01"))
        .await
        .unwrap();

    let res = app.get("/exportar", None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert!(res.headers[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .contains("relatorio_obras.csv"));

    let lines: Vec<&str> = res.body.lines().collect();
    assert_eq!(
        lines[0],
        "Obra;Numero NF;Categoria;Valor;Data;Pagamento;Observação"
    );
    assert_eq!(lines[1], "Obra Centro;NF-123456;Eletrica;1234.56;2024-03-01;PIX;");
}
