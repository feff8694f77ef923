#[cfg(feature = "lambda")]
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
#[cfg(feature = "lambda")]
use time_entry_manager::config::lambda::{LambdaConfig, Request, Response};
#[cfg(feature = "lambda")]
use time_entry_manager::utils::logger;

#[cfg(feature = "lambda")]
async fn function_handler(event: LambdaEvent<Request>) -> Result<Response, Error> {
    // 每次呼叫重新讀取設定與連線字串，與一般 function host 相同
    let lambda_config = LambdaConfig::from_env();
    Ok(lambda_config.handle(event.payload).await)
}

#[cfg(feature = "lambda")]
#[tokio::main]
async fn main() -> Result<(), Error> {
    logger::init_lambda_logger();

    run(service_fn(function_handler)).await
}
