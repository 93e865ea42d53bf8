use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::auth::pi_login,
        crate::api::payments::approve,
        crate::api::payments::complete,
        crate::api::payments::incomplete,
        crate::api::price::price,
        crate::api::wallet::get_wallet,
        crate::api::wallet::get_catalog,
        crate::api::wallet::spend,
        crate::api::wallet::set_wallet_address,
        crate::api::wallet::cancel_subscription,
        crate::api::missions::get_missions,
        crate::api::missions::track,
        crate::api::missions::claim,
        crate::api::missions::swap,
        crate::api::notifications::list,
        crate::api::notifications::mark_read,
        crate::api::notifications::clear
    ),
    components(
        schemas(
            crate::api::auth::PiLoginRequest,
            crate::api::auth::AuthResponse,
            crate::api::payments::ApproveRequest,
            crate::api::payments::CompleteRequest,
            crate::api::payments::IncompleteRequest,
            crate::api::payments::IncompletePayment,
            crate::api::payments::IncompleteTransaction,
            crate::api::wallet::SpendRequest,
            crate::api::wallet::WalletAddressRequest,
            crate::api::missions::TrackRequest,
            crate::missions::engine::ActionType,
            crate::missions::engine::ActionPayload
        )
    ),
    tags(
        (name = "auth", description = "Pi identity exchange"),
        (name = "payments", description = "Pi payment lifecycle"),
        (name = "wallet", description = "Ink balance and purchases"),
        (name = "missions", description = "Daily missions"),
        (name = "notifications", description = "Per-user notifications")
    )
)]
pub struct ApiDoc;
