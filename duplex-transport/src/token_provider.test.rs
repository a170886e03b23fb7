use super::*;

#[tokio::test]
async fn static_provider_returns_the_configured_token_every_time() {
    let provider = StaticTokenProvider::new("t1");
    assert_eq!(provider.get_valid_token().await.unwrap(), "t1");
    assert_eq!(provider.get_valid_token().await.unwrap(), "t1");
}
