use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use hotelbook::{
    app,
    config::Config,
    db::{
        self,
        bookings::{self, BookingStatus, NewBooking},
        rooms::{self, RoomForm},
        users::{self, Role},
    },
    events::{BookingEvent, ChangeKind},
    AppState,
};
use http_body_util::BodyExt;
use sqlx::SqlitePool;
use time::{Duration, OffsetDateTime};
use tower::ServiceExt;

const BOUNDARY: &str = "hotelbook-test-boundary";

async fn setup(admin_emails: &[&str]) -> (Router, AppState) {
    let config = Config {
        database_url: "sqlite::memory:".to_owned(),
        storage_dir: std::env::temp_dir().join(format!("hotelbook-{}", uuid::Uuid::now_v7().simple())),
        admin_emails: admin_emails.iter().map(|e| e.to_string()).collect(),
        ..Config::default()
    };
    let db_pool = db::connect(&config.database_url).await.unwrap();
    let state = AppState::new(config, db_pool).await.unwrap();
    (app(state.clone()), state)
}

async fn add_room(db_pool: &SqlitePool, name: &str, occupancy: i64) -> i64 {
    let room = RoomForm {
        name: name.to_owned(),
        description: "A *quiet* room.".to_owned(),
        cost: 120.0,
        occupancy,
        amenities: "WiFi, Balcony".to_owned(),
        ..RoomForm::default()
    };
    rooms::insert(db_pool, &room).await.unwrap()
}

async fn add_booking(db_pool: &SqlitePool, room_id: i64, email: &str) -> i64 {
    let check_in = OffsetDateTime::now_utc().date() + Duration::days(30);
    let booking = NewBooking {
        room_id,
        guest_name: "Grace Hopper".to_owned(),
        guest_email: email.to_owned(),
        guest_phone: "555-0199".to_owned(),
        check_in,
        check_out: check_in + Duration::days(1),
        guests: 1,
        special_requests: String::new(),
        total_cost: 120.0,
        payment_proof_url: None,
    };
    bookings::insert(db_pool, &booking).await.unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

async fn get(app: &Router, uri: &str, cookie: Option<&str>) -> Response {
    let mut request = Request::get(uri);
    if let Some(cookie) = cookie {
        request = request.header(header::COOKIE, cookie);
    }
    send(app, request.body(Body::empty()).unwrap()).await
}

async fn post_form(app: &Router, uri: &str, body: &str, cookie: Option<&str>) -> Response {
    let mut request = Request::post(uri).header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        request = request.header(header::COOKIE, cookie);
    }
    send(app, request.body(Body::from(body.to_owned())).unwrap()).await
}

async fn text(response: Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn location(response: &Response) -> &str {
    response.headers()[header::LOCATION].to_str().unwrap()
}

/// Every cookie the response sets, ready for a `Cookie` request header.
fn cookies(response: &Response) -> String {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok()?.split(';').next())
        .collect::<Vec<_>>()
        .join("; ")
}

fn sign_up_form(email: &str, return_url: Option<&str>) -> String {
    let mut form = format!("email={}&password=correct-horse&confirm=correct-horse", urlencoding::encode(email));
    if let Some(return_url) = return_url {
        form += &format!("&return_url={}", urlencoding::encode(return_url));
    }
    form
}

/// Signs up a password account and returns its cookies.
async fn sign_up(app: &Router, email: &str) -> String {
    let response = post_form(app, "/signup", &sign_up_form(email, Some("/")), None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
    cookies(&response)
}

fn multipart(fields: &[(&str, &str)], file: Option<(&str, &str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n").as_bytes(),
        );
    }
    if let Some((name, file_name, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn booking_request(body: Vec<u8>, cookie: Option<&str>) -> Request<Body> {
    let mut request = Request::post("/booking")
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"));
    if let Some(cookie) = cookie {
        request = request.header(header::COOKIE, cookie);
    }
    request.body(Body::from(body)).unwrap()
}

#[tokio::test]
async fn public_pages_render() {
    let (app, state) = setup(&[]).await;
    let room_id = add_room(&state.db_pool, "Harbour Suite", 2).await;

    let home = get(&app, "/", None).await;
    assert_eq!(home.status(), StatusCode::OK);
    assert!(text(home).await.contains("Harbour Suite"));

    assert_eq!(get(&app, "/rooms", None).await.status(), StatusCode::OK);
    assert_eq!(get(&app, "/contact", None).await.status(), StatusCode::OK);

    let room = text(get(&app, &format!("/rooms/{room_id}"), None).await).await;
    assert!(room.contains("<em>quiet</em>"));
    assert!(room.contains("<li>Balcony</li>"));

    let css = get(&app, "/static/site.css", None).await;
    assert_eq!(css.headers()[header::CONTENT_TYPE], "text/css");
}

#[tokio::test]
async fn terms_are_linked_from_sign_up() {
    let (app, _) = setup(&[]).await;

    let terms = get(&app, "/terms-and-privacy", None).await;
    assert_eq!(terms.status(), StatusCode::OK);
    let terms = text(terms).await;
    assert!(terms.contains("Terms of Service"));
    assert!(terms.contains("Privacy Policy"));

    assert!(text(get(&app, "/signup", None).await).await.contains(r#"href="/terms-and-privacy""#));
}

#[tokio::test]
async fn unknown_pages_are_404() {
    let (app, _) = setup(&[]).await;

    assert_eq!(get(&app, "/no-such-page", None).await.status(), StatusCode::NOT_FOUND);
    assert_eq!(get(&app, "/rooms/999", None).await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn protected_pages_send_visitors_to_sign_in() {
    let (app, _) = setup(&[]).await;

    let dashboard = get(&app, "/dashboard", None).await;
    assert_eq!(dashboard.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&dashboard), "/signin?return_url=%2Fdashboard");

    let mine = get(&app, "/my-bookings", None).await;
    assert_eq!(location(&mine), "/signin?return_url=%2Fmy-bookings");

    let booking = get(&app, "/booking?room_id=1", None).await;
    assert_eq!(location(&booking), "/signin?return_url=%2Fbooking%3Froom_id%3D1");

    let submit = send(&app, booking_request(multipart(&[("room_id", "1")], None), None)).await;
    assert_eq!(submit.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn return_url_survives_the_sign_in_round_trip() {
    let (app, _) = setup(&["boss@hotel.com"]).await;
    let path = "/dashboard/bookings?q=a+b%26c&status=pending";

    let redirect = get(&app, path, None).await;
    assert_eq!(
        location(&redirect),
        "/signin?return_url=%2Fdashboard%2Fbookings%3Fq%3Da%2Bb%2526c%26status%3Dpending"
    );

    let page = text(get(&app, location(&redirect), None).await).await;
    assert!(page.contains(r#"href="/signup?return_url=%2Fdashboard%2Fbookings%3Fq%3Da%2Bb%2526c%26status%3Dpending""#));
    assert!(page.contains(r#"value="/dashboard/bookings?q=a+b%26c&amp;status=pending""#));

    let signed_up = post_form(&app, "/signup", &sign_up_form("boss@hotel.com", Some(path)), None).await;
    assert_eq!(signed_up.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&signed_up), path);
}

#[tokio::test]
async fn sign_in_lands_by_role_without_a_return_url() {
    let (app, _) = setup(&["boss@hotel.com"]).await;

    let guest = post_form(&app, "/signup", &sign_up_form("guest@hotel.com", None), None).await;
    assert_eq!(location(&guest), "/booking");

    let boss = post_form(&app, "/signup", &sign_up_form("boss@hotel.com", Some("")), None).await;
    assert_eq!(location(&boss), "/dashboard");

    let again = post_form(&app, "/signin", "email=boss%40hotel.com&password=correct-horse&return_url=", None).await;
    assert_eq!(location(&again), "/dashboard");
}

#[tokio::test]
async fn signing_up_cannot_claim_an_existing_account() {
    let (app, state) = setup(&["boss@hotel.com"]).await;
    // an admin who has only ever signed in with Google
    users::ensure(&state.db_pool, "boss@hotel.com", Role::Admin).await.unwrap();

    let response = post_form(&app, "/signup", &sign_up_form("Boss@Hotel.com", Some("/dashboard")), None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let cookie = cookies(&response);
    assert!(text(response).await.contains("an account with that email already exists"));

    assert_ne!(get(&app, "/dashboard", Some(&cookie)).await.status(), StatusCode::OK);
    let boss = users::by_email(&state.db_pool, "boss@hotel.com").await.unwrap().unwrap();
    assert!(boss.password_hash.is_none());

    let sign_in = post_form(&app, "/signin", "email=boss%40hotel.com&password=correct-horse", None).await;
    assert_eq!(sign_in.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn passwords_are_added_only_from_inside_the_account() {
    let (app, _) = setup(&[]).await;

    let anonymous = get(&app, "/account/password", None).await;
    assert_eq!(location(&anonymous), "/signin?return_url=%2Faccount%2Fpassword");

    let guest = sign_up(&app, "guest@hotel.com").await;
    assert_eq!(get(&app, "/account/password", Some(&guest)).await.status(), StatusCode::OK);

    let response = post_form(&app, "/account/password", "password=new-password&confirm=new-password", Some(&guest)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(text(response).await.contains("already has a password"));
}

#[tokio::test]
async fn expired_sessions_are_told_why() {
    let (app, _) = setup(&[]).await;

    let guest = sign_up(&app, "guest@hotel.com").await;
    assert!(guest.contains("signed_in=1"));

    // the session store forgot the id, the marker cookie is still there
    let response = get(&app, "/my-bookings", Some("id=gone; signed_in=1")).await;
    assert_eq!(location(&response), "/signin?return_url=%2Fmy-bookings&expired=1");

    let page = get(&app, location(&response), Some("signed_in=1")).await;
    assert!(cookies(&page).contains("signed_in="));
    assert!(!cookies(&page).contains("signed_in=1"));
    assert!(text(page).await.contains("signed out after 2 minutes of inactivity"));

    let signed_out = get(&app, "/signout", Some(&guest)).await;
    assert_eq!(location(&signed_out), "/");
    assert!(!cookies(&signed_out).contains("signed_in=1"));
    assert_eq!(location(&get(&app, "/my-bookings", None).await), "/signin?return_url=%2Fmy-bookings");
}

#[tokio::test]
async fn admin_pages_need_the_admin_role() {
    let (app, _) = setup(&["boss@hotel.com"]).await;

    let guest = sign_up(&app, "guest@hotel.com").await;
    assert_eq!(get(&app, "/my-bookings", Some(&guest)).await.status(), StatusCode::OK);
    assert_eq!(get(&app, "/dashboard", Some(&guest)).await.status(), StatusCode::FORBIDDEN);
    assert_eq!(get(&app, "/inbox", Some(&guest)).await.status(), StatusCode::FORBIDDEN);

    let boss = sign_up(&app, "boss@hotel.com").await;
    for page in ["/dashboard", "/dashboard/bookings", "/inbox", "/edit-rooms"] {
        assert_eq!(get(&app, page, Some(&boss)).await.status(), StatusCode::OK, "{page}");
    }
}

#[tokio::test]
async fn invalid_contact_form_is_rejected() {
    let (app, _) = setup(&[]).await;

    let response = post_form(&app, "/contact", "name=Ada&email=not-an-email&subject=Hi&message=Hello", None).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(text(response).await.contains("not-an-email"));
}

#[tokio::test]
async fn booking_blocks_the_booked_nights() {
    let (app, state) = setup(&["boss@hotel.com"]).await;
    let room_id = add_room(&state.db_pool, "Garden Room", 2).await;
    let ada = sign_up(&app, "Ada@Example.com").await;

    let page = text(get(&app, "/booking", Some(&ada)).await).await;
    assert!(page.contains(r#"value="ada@example.com" readonly"#));

    let check_in = OffsetDateTime::now_utc().date() + Duration::days(10);
    let check_out = check_in + Duration::days(2);
    let (check_in_s, check_out_s, room_s) = (check_in.to_string(), check_out.to_string(), room_id.to_string());
    let fields = [
        ("room_id", room_s.as_str()),
        ("guest_name", "Ada Lovelace"),
        // ignored, bookings go under the account's email
        ("guest_email", "someone-else@example.com"),
        ("guest_phone", "555-0101"),
        ("check_in", check_in_s.as_str()),
        ("check_out", check_out_s.as_str()),
        ("guests", "2"),
        ("special_requests", ""),
    ];
    let proof = Some(("payment_proof", "proof.png", &b"png"[..]));

    let missing_proof = send(&app, booking_request(multipart(&fields, None), Some(&ada))).await;
    assert_eq!(missing_proof.status(), StatusCode::BAD_REQUEST);

    let booked = send(&app, booking_request(multipart(&fields, proof), Some(&ada))).await;
    assert_eq!(booked.status(), StatusCode::OK);
    assert!(text(booked).await.contains("$240.00"));

    let all = bookings::list_all(&state.db_pool).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].booking.guest_email, "ada@example.com");
    assert_eq!(all[0].booking.status, BookingStatus::Pending);

    let proof_url = all[0].booking.payment_proof_url.clone().unwrap();
    let stored = get(&app, &proof_url, None).await;
    assert_eq!(stored.status(), StatusCode::OK);
    assert_eq!(text(stored).await, "png");

    let taken = text(get(&app, &format!("/booking/unavailable/{room_id}"), None).await).await;
    let taken: Vec<String> = serde_json::from_str(&taken).unwrap();
    assert_eq!(taken, vec![check_in.to_string(), (check_in + Duration::days(1)).to_string()]);

    let again = send(&app, booking_request(multipart(&fields, proof), Some(&ada))).await;
    assert_eq!(again.status(), StatusCode::BAD_REQUEST);
    assert!(text(again).await.contains("already booked"));

    let mine = text(get(&app, "/my-bookings", Some(&ada)).await).await;
    assert!(mine.contains("Garden Room"));

    let boss = sign_up(&app, "boss@hotel.com").await;
    let rows = text(get(&app, "/dashboard/bookings?q=lovelace&status=pending&date=upcoming", Some(&boss)).await).await;
    assert!(rows.contains("1 of 1 bookings, 1 pending"));
    let rows = text(get(&app, "/dashboard/bookings?date=past", Some(&boss)).await).await;
    assert!(rows.contains("0 of 1 bookings"));
}

#[tokio::test]
async fn guests_cancel_only_their_own_pending_bookings() {
    let (app, state) = setup(&[]).await;
    let room_id = add_room(&state.db_pool, "Attic", 2).await;
    let grace_booking = add_booking(&state.db_pool, room_id, "grace@example.com").await;
    let confirmed = add_booking(&state.db_pool, room_id, "grace@example.com").await;
    bookings::set_status(&state.db_pool, confirmed, BookingStatus::Confirmed).await.unwrap();

    let ada = sign_up(&app, "ada@example.com").await;
    let grace = sign_up(&app, "grace@example.com").await;
    let mut rx = state.tx.subscribe();

    let cancel = |id: i64| format!("/my-bookings/{id}/cancel");

    let not_hers = post_form(&app, &cancel(grace_booking), "", Some(&ada)).await;
    assert_eq!(not_hers.status(), StatusCode::NOT_FOUND);

    let cancelled = post_form(&app, &cancel(grace_booking), "", Some(&grace)).await;
    assert_eq!(location(&cancelled), "/my-bookings");
    let booking = bookings::get(&state.db_pool, grace_booking).await.unwrap().unwrap();
    assert_eq!(booking.status, BookingStatus::Cancelled);
    assert_eq!(rx.recv().await.unwrap(), BookingEvent { kind: ChangeKind::Update, booking_id: grace_booking });

    let twice = post_form(&app, &cancel(grace_booking), "", Some(&grace)).await;
    assert_eq!(twice.status(), StatusCode::BAD_REQUEST);

    let too_late = post_form(&app, &cancel(confirmed), "", Some(&grace)).await;
    assert_eq!(too_late.status(), StatusCode::BAD_REQUEST);
    assert!(text(too_late).await.contains("a confirmed booking can&#39;t be cancelled online"));
}

#[tokio::test]
async fn admin_changes_reach_the_dashboard_channel() {
    let (app, state) = setup(&["boss@hotel.com"]).await;
    let room_id = add_room(&state.db_pool, "Attic", 2).await;
    let booking_id = add_booking(&state.db_pool, room_id, "grace@example.com").await;

    let guest = sign_up(&app, "grace@example.com").await;
    let boss = sign_up(&app, "boss@hotel.com").await;
    let mut rx = state.tx.subscribe();

    let status_uri = format!("/dashboard/bookings/{booking_id}/status");
    let forbidden = post_form(&app, &status_uri, "status=confirmed", Some(&guest)).await;
    assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

    let confirmed = post_form(&app, &status_uri, "status=confirmed", Some(&boss)).await;
    assert_eq!(location(&confirmed), "/dashboard");
    let booking = bookings::get(&state.db_pool, booking_id).await.unwrap().unwrap();
    assert_eq!(booking.status, BookingStatus::Confirmed);
    assert_eq!(rx.recv().await.unwrap(), BookingEvent { kind: ChangeKind::Update, booking_id });

    let deleted = post_form(&app, &format!("/dashboard/bookings/{booking_id}/delete"), "", Some(&boss)).await;
    assert_eq!(location(&deleted), "/dashboard");
    assert!(bookings::get(&state.db_pool, booking_id).await.unwrap().is_none());
    assert_eq!(rx.recv().await.unwrap(), BookingEvent { kind: ChangeKind::Delete, booking_id });
}

#[tokio::test]
async fn room_cost_must_be_a_real_number() {
    let (app, state) = setup(&["boss@hotel.com"]).await;
    let boss = sign_up(&app, "boss@hotel.com").await;

    for cost in ["NaN", "inf"] {
        let fields = [("name", "Attic"), ("description", "Up top"), ("cost", cost), ("occupancy", "2")];
        let request = Request::post("/edit-rooms")
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .header(header::COOKIE, &boss)
            .body(Body::from(multipart(&fields, None)))
            .unwrap();

        let response = send(&app, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{cost}");
        assert!(text(response).await.contains("cost must be a number"));
    }
    assert!(rooms::list(&state.db_pool).await.unwrap().is_empty());
}
