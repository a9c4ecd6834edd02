#[macro_use]
extern crate rocket;

use dotenv::dotenv;
use flight_ticketing_system::db::Database;
use flight_ticketing_system::services;
use flight_ticketing_system::swagger::swagger_ui;
use flight_ticketing_system::routes;
use rocket::fairing::AdHoc;
use rocket_okapi::openapi_get_routes;
use rocket_okapi::swagger_ui::make_swagger_ui;

#[launch]
async fn rocket() -> _ {
    dotenv().ok();

    // Connect to the database and bootstrap the schema
    let database =
        Database::new(&std::env::var("DATABASE_URL").expect("DATABASE_URL must be set"))
            .await
            .expect("Failed to connect to database");
    let pool = database.pool;

    let user_service = services::user_service::UserService::new(pool.clone());
    let flight_service = services::flight_service::FlightService::new(pool.clone());
    let ticket_service = services::ticket_service::TicketService::new(pool.clone());
    let payment_service = services::payment_service::PaymentService::new(pool.clone());

    rocket::build()
        .manage(user_service)
        .manage(flight_service)
        .manage(ticket_service)
        .manage(payment_service)
        .mount(
            "/api",
            openapi_get_routes![
                routes::user_route::register,
                routes::user_route::login,
                routes::flight_route::list_flights,
                routes::flight_route::get_flight,
                routes::flight_route::create_flight,
                routes::flight_route::update_flight,
                routes::flight_route::delete_flight,
                routes::flight_route::passengers,
                routes::ticket_route::buy_ticket,
                routes::ticket_route::cancel_ticket,
                routes::ticket_route::get_ticket,
                routes::ticket_route::list_tickets,
                routes::payment_route::create_intent,
                routes::payment_route::webhook,
                routes::payment_route::mock_capture,
                routes::payment_route::expire_due,
                routes::payment_route::get_payment,
                routes::payment_route::list_payments,
            ],
        )
        .mount("/swagger", make_swagger_ui(&swagger_ui()))
        .attach(AdHoc::on_response("CORS", |_, res| {
            Box::pin(async move {
                res.set_header(rocket::http::Header::new(
                    "Access-Control-Allow-Origin",
                    "*",
                ));
            })
        }))
}
