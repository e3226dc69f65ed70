//! Selector catalog for the configured storefront
//!
//! Every descriptor carries its fallbacks in confidence order: the stable
//! id first, then structural or text selectors that survive minor page
//! changes.

use element_locator::Descriptor;

pub(crate) fn username_field() -> Descriptor {
    Descriptor::new("username field")
        .css("#userid")
        .css("input[name='userid']")
}

pub(crate) fn continue_button() -> Descriptor {
    Descriptor::new("continue button")
        .css("#signin-continue-btn")
        .text("Continue")
}

pub(crate) fn password_field() -> Descriptor {
    Descriptor::new("password field")
        .css("#pass")
        .css("input[type='password']")
}

pub(crate) fn signin_button() -> Descriptor {
    Descriptor::new("sign-in button").css("#sgnBt").text("Sign in")
}

pub(crate) fn account_greeting() -> Descriptor {
    Descriptor::new("account greeting")
        .css("#gh-ug")
        .xpath("//span[contains(@class,'gh-identity')]")
}

pub(crate) fn profile_email() -> Descriptor {
    Descriptor::new("profile email")
        .test_id("profile-email")
        .css("#email")
        .xpath("//*[contains(@class,'email-value')]")
}

pub(crate) fn search_box() -> Descriptor {
    Descriptor::new("search box")
        .css("#gh-ac")
        .css("input[aria-label='Search for anything']")
}

pub(crate) fn search_button() -> Descriptor {
    Descriptor::new("search button").css("#gh-btn").text("Search")
}

pub(crate) fn results_heading() -> Descriptor {
    Descriptor::new("results heading")
        .css("h1.srp-controls__count-heading")
        .css(".srp-controls__count-heading")
}

pub(crate) fn max_price_input() -> Descriptor {
    Descriptor::new("max price input")
        .css("input[aria-label='Maximum Value in $']")
        .css(".x-textrange__input--to input")
}

pub(crate) fn price_filter_button() -> Descriptor {
    Descriptor::new("price filter button")
        .css(".x-textrange__button")
        .text("Submit price range")
}

pub(crate) fn first_result_link() -> Descriptor {
    Descriptor::new("first result link")
        .css("ul.srp-results li.s-item:first-of-type a.s-item__link")
        .xpath("(//li[contains(@class,'s-item')]//a[contains(@class,'s-item__link')])[1]")
}

pub(crate) fn add_to_cart_button() -> Descriptor {
    Descriptor::new("add to cart button")
        .css("#atcBtn_btn_1")
        .css("#atcBtn")
        .text("Add to cart")
}

pub(crate) fn cart_count() -> Descriptor {
    Descriptor::new("cart count badge")
        .css("#gh-cart-n")
        .css(".gh-cart__count")
}

pub(crate) fn cart_subtotal() -> Descriptor {
    Descriptor::new("cart subtotal")
        .test_id("SUBTOTAL")
        .css(".cart-bucket__subtotal .text-display span")
}
