use crate::error::Error;
use crate::resolver::{self, Resolution};
use crate::store::Store;
use tracing::error;
use trust_dns_proto::op::Query;
use trust_dns_server::authority::MessageResponseBuilder;
use trust_dns_server::client::op::{Header, MessageType, OpCode, ResponseCode};
use trust_dns_server::server::{Request, RequestHandler, ResponseHandler, ResponseInfo};

/// Bridges `trust-dns-server` requests onto the shared resolver.
#[derive(Clone)]
pub struct Handler {
    store: Store,
}

impl Handler {
    pub(super) fn new(store: Store) -> Self {
        Handler { store }
    }

    async fn dispatch_request<R: ResponseHandler>(
        &self,
        request: &Request,
        response: R,
    ) -> Result<ResponseInfo, Error> {
        // If it isn't a query, return NOTIMPL.
        if request.op_code() != OpCode::Query || request.message_type() != MessageType::Query {
            return self.handle_notimpl(request, response).await;
        }

        let question = Query::query(
            request.query().name().into(),
            request.query().query_type(),
        );
        let resolution = resolver::resolve(&self.store, &[question]);
        self.send_resolution(request, response, resolution).await
    }

    async fn handle_notimpl<R: ResponseHandler>(
        &self,
        request: &Request,
        mut response_handle: R,
    ) -> Result<ResponseInfo, Error> {
        let response = MessageResponseBuilder::from_message_request(request);
        Ok(response_handle
            .send_response(response.error_msg(request.header(), ResponseCode::NotImp))
            .await?)
    }

    async fn send_resolution<R: ResponseHandler>(
        &self,
        request: &Request,
        mut response_handle: R,
        resolution: Resolution,
    ) -> Result<ResponseInfo, Error> {
        let mut header = Header::response_from_request(request.header());
        header.set_authoritative(true);
        header.set_response_code(resolution.response_code);

        let builder = MessageResponseBuilder::from_message_request(request);
        let response = builder.build(
            header,
            resolution.answers.iter(),
            &[],
            resolution.authority.iter(),
            &[],
        );
        Ok(response_handle.send_response(response).await?)
    }
}

#[async_trait::async_trait]
impl RequestHandler for Handler {
    async fn handle_request<R: ResponseHandler>(
        &self,
        request: &Request,
        response_handle: R,
    ) -> ResponseInfo {
        match self.dispatch_request(request, response_handle).await {
            Ok(info) => info,
            Err(error) => {
                error!("error in RequestHandler: {:?}", error);
                let mut header = Header::new();
                header.set_response_code(ResponseCode::ServFail);
                header.into()
            }
        }
    }
}
