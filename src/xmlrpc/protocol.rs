//! XML-RPC call framing: `<methodCall>` rendering and `<methodResponse>`
//! parsing.

use thiserror::Error;
use xml::escape::escape_str_pcdata;

use crate::xmlrpc::encoding::{Parser, ParserError, Value};

/// A request to call a remote procedure.
#[derive(Debug)]
pub struct Request {
    method: String,
    params: Vec<Value>,
}

impl Request {
    pub fn new(method: &str) -> Request {
        Request {
            method: method.to_string(),
            params: Vec::new(),
        }
    }

    /// Appends one positional parameter.
    pub fn argument<T: Into<Value>>(mut self, value: T) -> Request {
        self.params.push(value.into());
        self
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    /// Renders the full `<methodCall>` document.
    pub fn body(&self) -> String {
        let mut body = String::from("<?xml version=\"1.0\"?>");
        body.push_str("<methodCall><methodName>");
        body.push_str(&escape_str_pcdata(&self.method));
        body.push_str("</methodName><params>");
        for param in &self.params {
            body.push_str("<param>");
            param.write_xml(&mut body);
            body.push_str("</param>");
        }
        body.push_str("</params></methodCall>");
        body
    }
}

/// A `<fault>` reported by the server.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("fault {code}: {message}")]
pub struct Fault {
    pub code: i32,
    pub message: String,
}

impl Fault {
    fn from_value(value: &Value) -> Result<Fault, ParserError> {
        let members = value.as_struct().ok_or_else(|| ParserError::Mismatch {
            expected: "fault struct".to_string(),
            found: "non-struct fault value".to_string(),
        })?;
        let code = members.get("faultCode").and_then(Value::as_i32).unwrap_or(0);
        let message = members
            .get("faultString")
            .and_then(Value::as_str)
            .unwrap_or("unknown fault")
            .to_string();
        Ok(Fault { code, message })
    }
}

/// A parsed `<methodResponse>`: either a single value or a fault.
#[derive(Debug)]
pub struct Response {
    result: Result<Value, Fault>,
}

impl Response {
    pub fn parse(body: &str) -> Result<Response, ParserError> {
        let mut parser = Parser::new(body.as_bytes());
        parser.expect_open("methodResponse")?;
        let result = match parser.open_any()?.as_str() {
            "params" => {
                parser.expect_open("param")?;
                let value = parser.parse_value()?;
                parser.expect_close("param")?;
                parser.expect_close("params")?;
                Ok(value)
            }
            "fault" => {
                let value = parser.parse_value()?;
                parser.expect_close("fault")?;
                Err(Fault::from_value(&value)?)
            }
            other => {
                return Err(ParserError::Mismatch {
                    expected: "params or fault".to_string(),
                    found: format!("<{}>", other),
                })
            }
        };
        parser.expect_close("methodResponse")?;
        Ok(Response { result })
    }

    pub fn result(self) -> Result<Value, Fault> {
        self.result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xmlrpc::encoding::Struct;

    #[test]
    fn renders_method_call() {
        let mut params = Struct::new();
        params.insert("password".to_string(), Value::from("secret"));
        params.insert("userimage".to_string(), Value::from("abc123"));

        let request = Request::new("grav.deleteUserimage").argument(Value::Struct(params));

        let expected = "<?xml version=\"1.0\"?>\
             <methodCall><methodName>grav.deleteUserimage</methodName>\
             <params><param><value><struct>\
             <member><name>password</name><value><string>secret</string></value></member>\
             <member><name>userimage</name><value><string>abc123</string></value></member>\
             </struct></value></param></params></methodCall>";
        assert_eq!(request.body(), expected);
    }

    #[test]
    fn renders_empty_params() {
        let request = Request::new("grav.test");
        assert_eq!(
            request.body(),
            "<?xml version=\"1.0\"?><methodCall><methodName>grav.test</methodName>\
             <params></params></methodCall>"
        );
    }

    #[test]
    fn parses_value_response() {
        let body = "<?xml version=\"1.0\" encoding=\"utf-8\"?>
            <methodResponse>
              <params>
                <param>
                  <value><string>5f2a36e52a</string></value>
                </param>
              </params>
            </methodResponse>";

        let result = Response::parse(body).unwrap().result().unwrap();
        assert_eq!(result, Value::from("5f2a36e52a"));
    }

    #[test]
    fn parses_struct_response() {
        let body = "<?xml version=\"1.0\"?>
            <methodResponse><params><param>
              <value><struct>
                <member><name>a9b1c2</name><value><int>1</int></value></member>
                <member><name>d3e4f5</name><value><int>0</int></value></member>
              </struct></value>
            </param></params></methodResponse>";

        let result = Response::parse(body).unwrap().result().unwrap();
        let members = result.as_struct().unwrap();
        assert_eq!(members.get("a9b1c2"), Some(&Value::Int(1)));
        assert_eq!(members.get("d3e4f5"), Some(&Value::Int(0)));
    }

    #[test]
    fn parses_fault_response() {
        let body = "<?xml version=\"1.0\"?>
            <methodResponse>
              <fault>
                <value><struct>
                  <member><name>faultCode</name><value><int>-9</int></value></member>
                  <member><name>faultString</name>
                    <value><string>Authentication error</string></value></member>
                </struct></value>
              </fault>
            </methodResponse>";

        let fault = Response::parse(body).unwrap().result().unwrap_err();
        assert_eq!(
            fault,
            Fault {
                code: -9,
                message: "Authentication error".to_string(),
            }
        );
    }

    #[test]
    fn rejects_non_response_document() {
        assert!(Response::parse("<?xml version=\"1.0\"?><html></html>").is_err());
    }
}
