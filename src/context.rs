use aws_config::{BehaviorVersion, Region, SdkConfig};
use fractic_context::define_ctx_view;

define_ctx_view!(
    name: AwsCtxView,
    env {
        AWS_REGION: String,
    },
    secrets {},
    deps_overlay {},
    req_impl {}
);

define_ctx_view!(
    name: SlackCtxView,
    env {},
    secrets {
        SLACK_BOT_TOKEN: String,
    },
    deps_overlay {},
    req_impl {}
);

/// Shared SDK config for all AWS-backed managers, pinned to the context's
/// region.
pub async fn load_aws_config(ctx: &impl AwsCtxView) -> SdkConfig {
    let region = Region::new(ctx.aws_region().clone());
    aws_config::defaults(BehaviorVersion::v2025_01_17())
        .region(region)
        .load()
        .await
}

#[cfg(test)]
pub(crate) mod test_ctx {
    use fractic_context::define_ctx;

    define_ctx!(
        name: TestCtx,
        env {
            AWS_REGION: String,
        },
        secrets_fetch_region: DUMMY,
        secrets_fetch_id: DUMMY,
        secrets {
            SLACK_BOT_TOKEN: String,
        },
        deps {},
        views {
            crate::AwsCtxView,
            crate::SlackCtxView,
        }
    );
}
