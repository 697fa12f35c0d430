pub mod delete_document_route;
pub mod document_request;
pub mod upload_document_route;
