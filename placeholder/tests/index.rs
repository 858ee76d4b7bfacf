use koe_placeholder::router;

#[tokio::test]
async fn index_serves_holding_page() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router()).await.unwrap();
    });

    let resp = reqwest::get(format!("http://{addr}/")).await.unwrap();
    assert!(resp.status().is_success());

    let body = resp.text().await.unwrap();
    assert!(body.contains("<h1>Under Construction</h1>"));
    assert!(body.contains("Seiun Sky"));
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router()).await.unwrap();
    });

    let resp = reqwest::get(format!("http://{addr}/api/voice")).await.unwrap();
    assert_eq!(resp.status().as_u16(), 404);
}
