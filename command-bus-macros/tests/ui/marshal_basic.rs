use command_bus::{Command, Marshal};

#[derive(Command, Marshal)]
struct RegisterUser {
    #[marshal(rename = "firstName")]
    first_name: String,
    #[marshal(rename = "lastName")]
    last_name: String,
    #[marshal(default)]
    admin: bool,
    #[marshal(default = "en")]
    locale: String,
    r#type: Option<String>,
}

#[derive(Command, Marshal)]
struct Empty {}

fn main() {
    let params = <RegisterUser as Marshal>::parameters();
    assert_eq!(params.len(), 5);
    assert_eq!(params[4].name(), "type");

    assert!(<Empty as Marshal>::parameters().is_empty());

    // 字段仅在构造中使用，避免未读告警
    let u = RegisterUser {
        first_name: String::new(),
        last_name: String::new(),
        admin: false,
        locale: String::new(),
        r#type: None,
    };
    let _ = (u.first_name, u.last_name, u.admin, u.locale, u.r#type);
}
