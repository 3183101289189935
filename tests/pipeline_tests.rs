mod common;
use common::{campground_form, client, fetch_detail, location, register, spawn_app};

// The full authorization pipeline, driven end to end over real session
// cookies (no bypass header): two identities contending over one campground
// and its review.

#[tokio::test]
async fn two_identities_full_lifecycle() {
    let app = spawn_app().await;

    // Two registered identities, each with its own cookie jar.
    let ursula = client();
    register(&ursula, &app.address, "ursula", "a long enough password").await;
    let victor = client();
    register(&victor, &app.address, "victor", "another fine password").await;

    // U creates Campground C (price 25, title "Pine Ridge").
    let response = ursula
        .post(format!("{}/campgrounds", app.address))
        .multipart(campground_form("Pine Ridge", "North Valley", "25"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 303);
    let path = location(&response);

    // V (≠ U) attempts PUT on C → Forbidden: bounced back with flash, and
    // the persisted price is untouched.
    let response = victor
        .put(format!("{}{}", app.address, path))
        .multipart(campground_form("Pine Ridge", "North Valley", "99"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 303);
    assert_eq!(location(&response), path);
    let detail = fetch_detail(&victor, &app.address, &path).await;
    assert_eq!(
        detail.flash.error,
        vec!["You do not have permission to do that"]
    );
    assert_eq!(detail.campground.price, 25.0);

    // U attempts PUT changing price to 30 → success, persisted price is 30.
    let response = ursula
        .put(format!("{}{}", app.address, path))
        .multipart(campground_form("Pine Ridge", "North Valley", "30"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 303);
    let detail = fetch_detail(&ursula, &app.address, &path).await;
    assert_eq!(detail.campground.price, 30.0);

    // V posts a Review {rating 4, body "Great spot"} on C → success, the
    // review's author is V.
    let response = victor
        .post(format!("{}{}/reviews", app.address, path))
        .form(&[("rating", "4"), ("body", "Great spot")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 303);
    let detail = fetch_detail(&victor, &app.address, &path).await;
    assert_eq!(detail.reviews.len(), 1);
    let review = &detail.reviews[0];
    assert_eq!(review.rating, 4);
    assert_eq!(review.body, "Great spot");
    assert_eq!(review.author_username.as_deref(), Some("victor"));
    let review_id = review.id;

    // U attempts DELETE on V's Review → Forbidden; the review survives.
    let response = ursula
        .delete(format!("{}{}/reviews/{}", app.address, path, review_id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 303);
    assert_eq!(location(&response), path);
    assert_eq!(
        fetch_detail(&ursula, &app.address, &path).await.reviews.len(),
        1
    );

    // V attempts DELETE on V's Review → success; the review is no longer
    // listed under C.
    let response = victor
        .delete(format!("{}{}/reviews/{}", app.address, path, review_id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 303);
    assert!(
        fetch_detail(&victor, &app.address, &path).await.reviews.is_empty()
    );
}
