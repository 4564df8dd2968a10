pub mod germline;
