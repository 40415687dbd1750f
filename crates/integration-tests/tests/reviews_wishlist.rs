//! Integration tests for reviews, rating summaries and wishlists.

#![allow(clippy::unwrap_used)]

use rust_decimal::Decimal;

use lumen_core::ProductId;
use lumen_integration_tests::{fixture, guest_ctx, session, user, user_ctx};
use lumen_storefront::error::ShopError;
use lumen_storefront::services::{
    CatalogService, ReviewService, SessionWishlist, StoreWishlist, WishlistView,
    reviews::MAX_COMMENT_LENGTH, wishlist_for,
};

// =============================================================================
// Reviews
// =============================================================================

#[tokio::test]
async fn test_one_review_per_user_and_product() {
    let fx = fixture().await;
    let reviews = ReviewService::new(&fx.store);

    let review = reviews
        .add_review(user(1).id, fx.lamp.id, 4, "  Warm light, sturdy base. ")
        .await
        .unwrap();
    assert_eq!(review.comment, "Warm light, sturdy base.");

    assert!(matches!(
        reviews.add_review(user(1).id, fx.lamp.id, 2, "Changed my mind").await,
        Err(ShopError::DuplicateReview)
    ));
    // Another product is fine.
    reviews
        .add_review(user(1).id, fx.bulb.id, 5, "")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_review_validation() {
    let fx = fixture().await;
    let reviews = ReviewService::new(&fx.store);

    for rating in [0, 6, -1] {
        assert!(matches!(
            reviews.add_review(user(1).id, fx.lamp.id, rating, "").await,
            Err(ShopError::Validation { .. })
        ));
    }

    let long = "x".repeat(MAX_COMMENT_LENGTH + 1);
    assert!(matches!(
        reviews.add_review(user(1).id, fx.lamp.id, 3, &long).await,
        Err(ShopError::Validation { .. })
    ));

    assert!(matches!(
        reviews
            .add_review(user(1).id, ProductId::new(9999), 3, "")
            .await,
        Err(ShopError::NotFound("Product"))
    ));
    assert_eq!(reviews.reviews(fx.lamp.id).await.unwrap().len(), 0);
}

#[tokio::test]
async fn test_rating_summary_on_product_detail() {
    let fx = fixture().await;
    let reviews = ReviewService::new(&fx.store);
    for (user_id, rating) in [(1, 5), (2, 4), (3, 4)] {
        reviews
            .add_review(user(user_id).id, fx.lamp.id, rating, "")
            .await
            .unwrap();
    }

    let summary = reviews.rating_summary(fx.lamp.id).await.unwrap();
    assert_eq!(summary.count, 3);
    assert_eq!(summary.average, Decimal::new(433, 2));

    let detail = CatalogService::new(&fx.store)
        .product_detail(&fx.lamp.slug)
        .await
        .unwrap();
    assert_eq!(detail.rating, summary);
    assert_eq!(detail.variants.len(), 1);
    assert_eq!(detail.effective_price, Decimal::new(80, 0));

    let empty = reviews.rating_summary(fx.bulb.id).await.unwrap();
    assert_eq!(empty.count, 0);
    assert_eq!(empty.average, Decimal::ZERO);
}

// =============================================================================
// Wishlists
// =============================================================================

#[tokio::test]
async fn test_user_wishlist_toggle_and_remove() {
    let fx = fixture().await;
    let wishlist = StoreWishlist::new(&fx.store, user(1).id);

    assert!(wishlist.toggle(fx.lamp.id).await.unwrap());
    wishlist.add(fx.lamp.id).await.unwrap();
    assert_eq!(wishlist.count().await.unwrap(), 1);

    assert!(!wishlist.toggle(fx.lamp.id).await.unwrap());
    assert_eq!(wishlist.count().await.unwrap(), 0);

    assert!(!wishlist.remove(fx.lamp.id).await.unwrap());
    assert!(matches!(
        wishlist.add(ProductId::new(9999)).await,
        Err(ShopError::NotFound("Product"))
    ));
}

#[tokio::test]
async fn test_guest_wishlist_lives_in_session() {
    let fx = fixture().await;
    let session = session();
    let wishlist = SessionWishlist::new(&fx.store, &session);

    wishlist.add(fx.bulb.id).await.unwrap();
    wishlist.add(fx.lamp.id).await.unwrap();
    wishlist.add(fx.bulb.id).await.unwrap();
    let ids: Vec<_> = wishlist.ids().await.unwrap().into_iter().collect();
    assert_eq!(ids.len(), 2);

    // A second view over the same session sees the same list.
    let again = SessionWishlist::new(&fx.store, &session);
    assert!(again.remove(fx.bulb.id).await.unwrap());
    assert_eq!(wishlist.count().await.unwrap(), 1);

    // Nothing reaches the persisted table.
    assert_eq!(
        StoreWishlist::new(&fx.store, user(1).id)
            .count()
            .await
            .unwrap(),
        0
    );
}

#[tokio::test]
async fn test_wishlist_for_picks_backing_list() {
    let fx = fixture().await;
    let session = session();

    let guest = guest_ctx("guest-wish");
    wishlist_for(&fx.store, &session, &guest)
        .add(fx.lamp.id)
        .await
        .unwrap();

    let signed_in = user_ctx(4);
    let user_list = wishlist_for(&fx.store, &session, &signed_in);
    assert_eq!(user_list.count().await.unwrap(), 0);
    user_list.add(fx.bulb.id).await.unwrap();

    let persisted = StoreWishlist::new(&fx.store, user(4).id);
    let ids: Vec<_> = persisted.ids().await.unwrap().into_iter().collect();
    assert_eq!(ids, vec![fx.bulb.id]);
}
