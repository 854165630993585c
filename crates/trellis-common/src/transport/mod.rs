pub mod http;


pub use self::http::{
    header_str, http_handler, ConnectionState, http_sender, json_response, status_response, HttpHandler, HttpRequest,
    HttpResponse, HttpSender, IncomingContext, OutgoingContext, RemoteAddr, JSON_CONTENT_TYPE,
};
