//! Process-wide registry installation. Kept in its own test binary because
//! the registry can only be installed once per process.

use rsal::{
    registry, AccessLogFormatter, Error, Formatter, Headers, RegistryBuilder, RequestInfo,
    RequestRecord,
};

#[test]
fn test_install_then_use() {
    let custom = RegistryBuilder::with_defaults()
        .register("STATUS_CLASS", |info: &dyn RequestInfo| {
            format!("{}xx", info.response_code() / 100)
        })
        .build();
    registry::install(custom).unwrap();

    let formatter = AccessLogFormatter::new("%STATUS_CLASS% %RESPONSE_CODE%").unwrap();
    let info = RequestRecord::new().with_response_code(404);
    assert_eq!(formatter.format(&Headers::new(), &Headers::new(), &info), "4xx 404");

    let again = registry::install(RegistryBuilder::new().build());
    assert!(matches!(again, Err(Error::RegistryInitialized)));
    assert!(registry::global().contains("STATUS_CLASS"));
}
