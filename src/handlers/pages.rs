use axum::response::Html;

static INDEX_HTML: &str = include_str!("../web/index.html");
static BOOKING_HTML: &str = include_str!("../web/booking.html");
static CART_HTML: &str = include_str!("../web/cart.html");
static CONTACT_HTML: &str = include_str!("../web/contact.html");

pub async fn home() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub async fn booking_page() -> Html<&'static str> {
    Html(BOOKING_HTML)
}

pub async fn cart_page() -> Html<&'static str> {
    Html(CART_HTML)
}

pub async fn contact_page() -> Html<&'static str> {
    Html(CONTACT_HTML)
}
