//! Server construction for the probe listener.

use std::net::SocketAddr;

use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};

use webhook_receiver::inbound::http::health::{HealthState, LeaderState, leader, live, ready};

fn build_app(
    health_state: web::Data<HealthState>,
    leader_state: web::Data<LeaderState>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(health_state)
        .app_data(leader_state)
        .service(ready)
        .service(live)
        .service(leader)
}

/// Construct the Actix HTTP server and mark it ready once bound.
///
/// # Errors
/// Propagates [`std::io::Error`] when binding the socket fails.
pub fn create_server(
    health_state: web::Data<HealthState>,
    leader_state: web::Data<LeaderState>,
    bind_addr: SocketAddr,
) -> std::io::Result<Server> {
    let server_health_state = health_state.clone();
    let server = HttpServer::new(move || {
        build_app(server_health_state.clone(), leader_state.clone())
    })
    .bind(bind_addr)?
    .run();

    health_state.mark_ready();
    Ok(server)
}
