use actix_web::{body::BoxBody, http::header::ContentType, HttpRequest, HttpResponse, Responder};

use super::models::{EmailDetailOutDTO, EmailListOutDTO, MailboxListOutDTO};

macro_rules! json_responder {
    ($dto:ty) => {
        impl Responder for $dto {
            type Body = BoxBody;

            fn respond_to(self, _req: &HttpRequest) -> HttpResponse<Self::Body> {
                let body = match serde_json::to_string(&self) {
                    Ok(val) => val,
                    Err(err) => {
                        return HttpResponse::InternalServerError()
                            .body(format!("Error serializing response: {}", err))
                    }
                };

                HttpResponse::Ok()
                    .content_type(ContentType::json())
                    .body(body)
            }
        }
    };
}

json_responder!(EmailDetailOutDTO);
json_responder!(EmailListOutDTO);
json_responder!(MailboxListOutDTO);
