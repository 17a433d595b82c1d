//! HTTP handlers and route configuration.

mod admin;
mod auth;
mod health;
mod posts;
mod social;
mod views;

#[cfg(test)]
mod tests;

use actix_web::web;

/// Upper bound for urlencoded bodies; post forms carry base64 images.
const MAX_FORM_BYTES: usize = 10 * 1024 * 1024;

/// Configure all application routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::FormConfig::default().limit(MAX_FORM_BYTES))
        // Public pages
        .route("/", web::get().to(posts::index))
        .route("/group/{slug}/", web::get().to(posts::group_posts))
        .route("/profile/{username}/", web::get().to(posts::profile))
        .route("/posts/{post_id}/", web::get().to(posts::post_detail))
        .route("/health/", web::get().to(health::health_check))
        // Authoring
        .service(
            web::resource("/create/")
                .route(web::get().to(posts::post_create_form))
                .route(web::post().to(posts::post_create)),
        )
        .service(
            web::resource("/posts/{post_id}/edit/")
                .route(web::get().to(posts::post_edit_form))
                .route(web::post().to(posts::post_edit)),
        )
        .route("/posts/{post_id}/comment/", web::post().to(posts::add_comment))
        // Subscriptions and reactions
        .route("/follow/", web::get().to(posts::follow_index))
        .route(
            "/profile/{username}/follow/",
            web::post().to(social::profile_follow),
        )
        .route(
            "/profile/{username}/unfollow/",
            web::post().to(social::profile_unfollow),
        )
        .service(
            web::resource("/posts/{post_id}/like/")
                .route(web::get().to(social::like_post))
                .route(web::post().to(social::like_post)),
        )
        .service(
            web::resource("/posts/{post_id}/unlike/")
                .route(web::get().to(social::unlike_post))
                .route(web::post().to(social::unlike_post)),
        )
        .service(
            web::resource("/posts/{post_id}/dislike/")
                .route(web::get().to(social::dislike_post))
                .route(web::post().to(social::dislike_post)),
        )
        .service(
            web::resource("/posts/{post_id}/undislike/")
                .route(web::get().to(social::undislike_post))
                .route(web::post().to(social::undislike_post)),
        )
        // Session
        .service(
            web::scope("/auth")
                .service(
                    web::resource("/login/")
                        .route(web::get().to(auth::login_page))
                        .route(web::post().to(auth::login)),
                )
                .route("/signup/", web::post().to(auth::signup))
                .route("/logout/", web::post().to(auth::logout))
                .route("/me/", web::get().to(auth::me)),
        )
        // Staff screens
        .service(
            web::scope("/admin")
                .route("/posts/", web::get().to(admin::posts))
                .route("/posts/{post_id}/", web::post().to(admin::update_post))
                .service(
                    web::resource("/groups/")
                        .route(web::get().to(admin::groups))
                        .route(web::post().to(admin::create_group)),
                )
                .route("/comments/", web::get().to(admin::comments))
                .route("/follows/", web::get().to(admin::follows))
                .route("/likes/", web::get().to(admin::likes))
                .route("/dislikes/", web::get().to(admin::dislikes)),
        );
}
