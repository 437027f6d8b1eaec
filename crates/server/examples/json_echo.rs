use aqueduct::{Server, ServerConfig};
use aqueduct_http::handler::{Channel, controller_fn};
use aqueduct_http::protocol::{BoxError, Request, Response};
use http::StatusCode;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug)]
struct TestModel {
    id: u64,
    name: String,
}

// curl -v -H 'Content-Type: application/json' -d '{"id":1,"name":"hello"}' http://[::1]:8080/
async fn echo(request: Request) -> Result<Response, BoxError> {
    let model: TestModel = request.decode_body()?;
    Ok(Response::json(StatusCode::OK, &model))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::from_env()?;
    let channel = Channel::new(controller_fn(echo));

    Server::builder().config(config).channel(channel).build()?.run()?;
    Ok(())
}
